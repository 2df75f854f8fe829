//! Material, receipt and write-off models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw material tracked in the workshop stock
///
/// Identity within an organization is the `(name, color)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Unit of measure (e.g., "kg", "m", "pcs")
    pub unit: String,
    pub color: Option<String>,
    pub category: Option<String>,
    /// Minimum stock threshold for low-stock reporting
    pub min_stock: Option<Decimal>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discrete batch of material acquired at a point in time and price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialReceipt {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub receipt_date: NaiveDate,
    /// Optional supplier batch reference
    pub batch_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded consumption of a specific quantity from a specific receipt
///
/// The unit price is copied from the receipt at allocation time, so the
/// locked-in cost is immune to later receipt price edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialWriteOff {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub production_id: Uuid,
    pub material_id: Uuid,
    pub receipt_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time snapshot of a receipt used by the allocator and ledger math
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLot {
    pub receipt_id: Uuid,
    pub receipt_date: NaiveDate,
    pub quantity: Decimal,
    /// Quantity already consumed from this receipt by write-offs
    pub allocated: Decimal,
    pub unit_price: Decimal,
}

impl ReceiptLot {
    /// Unconsumed remainder of this receipt
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.allocated
    }
}

/// Stock ledger balance for a material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub material_id: Uuid,
    pub current_stock: Decimal,
    /// FIFO-remainder-weighted average price, not a lifetime average
    pub average_price: Decimal,
    pub total_value: Decimal,
    pub is_below_minimum: bool,
}
