//! FIFO allocation and stock ledger arithmetic
//!
//! Pure functions over [`ReceiptLot`] snapshots. The backend loads receipt rows
//! (with row locks when committing) and delegates the actual allocation and
//! valuation math to this module, so the ordering and cost rules can be tested
//! without a database.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ReceiptLot;

/// Decimal places kept for monetary values
pub const MONEY_DP: u32 = 2;

/// Decimal places kept for quantities
///
/// Quantities carry more precision than money so repeated small allocations do
/// not compound rounding error.
pub const QUANTITY_DP: u32 = 4;

/// Round a monetary value to 2 decimal places
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(MONEY_DP)
}

/// Round a quantity to 4 decimal places
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp(QUANTITY_DP)
}

/// One planned write-off against a specific receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub receipt_id: Uuid,
    pub quantity: Decimal,
    /// Unit price copied from the receipt, locking in the cost
    pub unit_price: Decimal,
}

/// Requirement could not be satisfied from the available lots
#[derive(Debug, Clone, PartialEq, Error)]
#[error("insufficient stock: required {required}, available {available}")]
pub struct StockShortage {
    pub required: Decimal,
    pub available: Decimal,
}

/// Plan a FIFO allocation of `required` units across the given lots.
///
/// Lots are consumed oldest-first, ordered by `(receipt_date, receipt_id)`
/// ascending. The id tie-break keeps allocation deterministic when several
/// receipts share a date, which matters because the order decides the
/// locked-in cost. Partial allocation is never returned: if the lots cannot
/// cover the full requirement the whole plan fails.
pub fn plan_fifo_allocation(
    lots: &[ReceiptLot],
    required: Decimal,
) -> Result<Vec<AllocationLine>, StockShortage> {
    let mut ordered: Vec<&ReceiptLot> = lots.iter().collect();
    ordered.sort_by(|a, b| {
        a.receipt_date
            .cmp(&b.receipt_date)
            .then(a.receipt_id.cmp(&b.receipt_id))
    });

    let mut remaining = required;
    let mut lines = Vec::new();

    for lot in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }
        let available = lot.remaining();
        if available <= Decimal::ZERO {
            continue;
        }
        let take = available.min(remaining);
        lines.push(AllocationLine {
            receipt_id: lot.receipt_id,
            quantity: round_quantity(take),
            unit_price: lot.unit_price,
        });
        remaining -= take;
    }

    if remaining > Decimal::ZERO {
        return Err(StockShortage {
            required,
            available: current_stock(lots),
        });
    }

    Ok(lines)
}

/// Total cost of a planned allocation
pub fn allocation_cost(lines: &[AllocationLine]) -> Decimal {
    lines.iter().map(|l| l.quantity * l.unit_price).sum()
}

/// Current stock: total received minus total written off
pub fn current_stock(lots: &[ReceiptLot]) -> Decimal {
    lots.iter().map(ReceiptLot::remaining).sum()
}

/// Total value of the unconsumed remainder of each lot
pub fn remainder_value(lots: &[ReceiptLot]) -> Decimal {
    lots.iter()
        .filter(|lot| lot.remaining() > Decimal::ZERO)
        .map(|lot| lot.remaining() * lot.unit_price)
        .sum()
}

/// FIFO-remainder-weighted average price, 0 when stock is empty
///
/// This is not a lifetime average: it shifts as old lots are consumed and only
/// the remainder of each receipt contributes.
pub fn average_price(lots: &[ReceiptLot]) -> Decimal {
    let stock = current_stock(lots);
    if stock <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(remainder_value(lots) / stock)
}
