//! Stock ledger tests
//!
//! Tests for lot-level balance and valuation including:
//! - Current stock as total received minus total written off
//! - FIFO-remainder-weighted average price
//! - Average price shifting as old lots are consumed
//! - Monetary and quantity rounding

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::allocation::{
    average_price, current_stock, plan_fifo_allocation, remainder_value, round_money,
    round_quantity,
};
use shared::models::ReceiptLot;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn lot(receipt_date: NaiveDate, quantity: &str, allocated: &str, unit_price: &str) -> ReceiptLot {
    ReceiptLot {
        receipt_id: Uuid::new_v4(),
        receipt_date,
        quantity: dec(quantity),
        allocated: dec(allocated),
        unit_price: dec(unit_price),
    }
}

/// Apply a planned allocation back onto the lots, as committing a production does
fn consume(lots: &mut [ReceiptLot], required: Decimal) {
    let plan = plan_fifo_allocation(lots, required).unwrap();
    for line in plan {
        let lot = lots
            .iter_mut()
            .find(|l| l.receipt_id == line.receipt_id)
            .unwrap();
        lot.allocated += line.quantity;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Stock is receipts minus write-offs
    #[test]
    fn test_current_stock() {
        let lots = vec![
            lot(date(2025, 1, 1), "100.0", "30.0", "5.00"),
            lot(date(2025, 1, 5), "50.0", "0", "6.00"),
        ];

        assert_eq!(current_stock(&lots), dec("120.0"));
    }

    /// Empty ledger has zero stock and zero average price
    #[test]
    fn test_empty_ledger() {
        assert_eq!(current_stock(&[]), Decimal::ZERO);
        assert_eq!(average_price(&[]), Decimal::ZERO);
        assert_eq!(remainder_value(&[]), Decimal::ZERO);
    }

    /// Fully consumed stock also yields a zero average, not a division error
    #[test]
    fn test_fully_consumed_average_is_zero() {
        let lots = vec![lot(date(2025, 1, 1), "100.0", "100.0", "5.00")];
        assert_eq!(average_price(&lots), Decimal::ZERO);
    }

    /// Average is weighted by remainders, not by original receipt sizes
    #[test]
    fn test_average_weighted_by_remainder() {
        // 10kg left @ 5.00 plus 50kg @ 6.00: (50 + 300) / 60 = 5.8333 -> 5.83
        let lots = vec![
            lot(date(2025, 1, 1), "100.0", "90.0", "5.00"),
            lot(date(2025, 1, 5), "50.0", "0", "6.00"),
        ];

        assert_eq!(average_price(&lots), dec("5.83"));
    }

    /// Consuming the old cheap lot pulls the average up to the new price
    #[test]
    fn test_average_shifts_as_old_lots_drain() {
        let mut lots = vec![
            lot(date(2025, 1, 1), "100.0", "0", "5.00"),
            lot(date(2025, 1, 5), "50.0", "0", "6.00"),
        ];

        // (500 + 300) / 150 = 5.3333 -> 5.33
        assert_eq!(average_price(&lots), dec("5.33"));

        consume(&mut lots, dec("120.0"));

        // Only 30kg of the 6.00 lot remains
        assert_eq!(current_stock(&lots), dec("30.0"));
        assert_eq!(average_price(&lots), dec("6.00"));
    }

    /// Remainder value counts only unconsumed quantity
    #[test]
    fn test_remainder_value() {
        let lots = vec![
            lot(date(2025, 1, 1), "100.0", "60.0", "5.00"),
            lot(date(2025, 1, 5), "50.0", "0", "6.00"),
        ];

        // 40 * 5.00 + 50 * 6.00 = 500.00
        assert_eq!(remainder_value(&lots), dec("500.00"));
    }

    /// Money rounds to 2 decimal places, half away from zero
    #[test]
    fn test_money_rounding() {
        assert_eq!(round_money(dec("5.166666")), dec("5.17"));
        assert_eq!(round_money(dec("5.164")), dec("5.16"));
        assert_eq!(round_money(dec("5.165")), dec("5.17"));
    }

    /// Quantities keep 4 decimal places
    #[test]
    fn test_quantity_rounding() {
        assert_eq!(round_quantity(dec("0.123456")), dec("0.1235"));
        assert_eq!(round_quantity(dec("10.00004")), dec("10.0000"));
    }

    /// Low-stock comparison is against the remaining balance
    #[test]
    fn test_low_stock_threshold() {
        let lots = vec![lot(date(2025, 1, 1), "100.0", "80.0", "5.00")];
        let min_stock = dec("25.0");

        assert!(current_stock(&lots) < min_stock);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    fn lots_strategy() -> impl Strategy<Value = Vec<ReceiptLot>> {
        prop::collection::vec((quantity_strategy(), price_strategy(), 0u32..365), 1..10).prop_map(
            |entries| {
                let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
                entries
                    .into_iter()
                    .map(|(quantity, unit_price, offset)| ReceiptLot {
                        receipt_id: Uuid::new_v4(),
                        receipt_date: base + chrono::Duration::days(offset as i64),
                        quantity,
                        allocated: Decimal::ZERO,
                        unit_price,
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Average price stays within the min/max unit price of live lots
        #[test]
        fn prop_average_price_bounded(lots in lots_strategy()) {
            let avg = average_price(&lots);

            let min = lots.iter().map(|l| l.unit_price).min().unwrap();
            let max = lots.iter().map(|l| l.unit_price).max().unwrap();

            // Allow for the final 2 dp rounding step
            let half_cent = dec("0.005");
            prop_assert!(avg >= min - half_cent);
            prop_assert!(avg <= max + half_cent);
        }

        /// Stock after consumption drops by exactly the consumed quantity
        #[test]
        fn prop_consumption_reduces_stock(
            lots in lots_strategy(),
            fraction in 1u32..=100
        ) {
            let before = current_stock(&lots);
            let required = (before * Decimal::from(fraction) / Decimal::from(100))
                .round_dp(4);
            if required <= Decimal::ZERO {
                return Ok(());
            }

            let mut lots = lots;
            consume(&mut lots, required);

            prop_assert_eq!(current_stock(&lots), before - required);
        }

        /// No lot ever goes negative, however much is consumed
        #[test]
        fn prop_no_negative_remainder(
            lots in lots_strategy(),
            fraction in 1u32..=100
        ) {
            let before = current_stock(&lots);
            let required = (before * Decimal::from(fraction) / Decimal::from(100))
                .round_dp(4);
            if required <= Decimal::ZERO {
                return Ok(());
            }

            let mut lots = lots;
            consume(&mut lots, required);

            for lot in &lots {
                prop_assert!(lot.remaining() >= Decimal::ZERO);
            }
        }

        /// Value identity: remainder value equals stock times unrounded average
        #[test]
        fn prop_value_identity(lots in lots_strategy()) {
            let stock = current_stock(&lots);
            let value = remainder_value(&lots);

            if stock > Decimal::ZERO {
                let unrounded = value / stock;
                prop_assert_eq!(average_price(&lots), round_money(unrounded));
            } else {
                prop_assert_eq!(average_price(&lots), Decimal::ZERO);
            }
        }

        /// Uniform prices make the average exactly that price
        #[test]
        fn prop_uniform_price_average(
            quantities in prop::collection::vec(quantity_strategy(), 1..10),
            price in price_strategy()
        ) {
            let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let lots: Vec<ReceiptLot> = quantities
                .into_iter()
                .enumerate()
                .map(|(i, quantity)| ReceiptLot {
                    receipt_id: Uuid::new_v4(),
                    receipt_date: base + chrono::Duration::days(i as i64),
                    quantity,
                    allocated: Decimal::ZERO,
                    unit_price: price,
                })
                .collect();

            prop_assert_eq!(average_price(&lots), round_money(price));
        }
    }
}
