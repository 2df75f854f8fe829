//! Material and receipt input validation tests

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::validation::{
    validate_markup_percent, validate_name, validate_positive_quantity,
    validate_production_quantity, validate_unit, validate_unit_price,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Receipt quantities must be strictly positive
    #[test]
    fn test_quantity_must_be_positive() {
        assert!(validate_positive_quantity(dec("0.0001")).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(dec("-1.0")).is_err());
    }

    /// Unit prices may be zero (donated stock) but never negative
    #[test]
    fn test_unit_price_non_negative() {
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(dec("12.50")).is_ok());
        assert!(validate_unit_price(dec("-0.01")).is_err());
    }

    /// Production quantities are whole units, at least one
    #[test]
    fn test_production_quantity() {
        assert!(validate_production_quantity(1).is_ok());
        assert!(validate_production_quantity(500).is_ok());
        assert!(validate_production_quantity(0).is_err());
        assert!(validate_production_quantity(-3).is_err());
    }

    /// Markup is a percentage from 0 to 1000
    #[test]
    fn test_markup_bounds() {
        assert!(validate_markup_percent(Decimal::ZERO).is_ok());
        assert!(validate_markup_percent(dec("50")).is_ok());
        assert!(validate_markup_percent(dec("1000")).is_ok());
        assert!(validate_markup_percent(dec("1000.01")).is_err());
        assert!(validate_markup_percent(dec("-1")).is_err());
    }

    /// Names must be non-empty after trimming and bounded
    #[test]
    fn test_name_validation() {
        assert!(validate_name("Steel").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(255)).is_ok());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    /// Units of measure are short non-empty strings
    #[test]
    fn test_unit_validation() {
        assert!(validate_unit("kg").is_ok());
        assert!(validate_unit("pcs").is_ok());
        assert!(validate_unit("").is_err());
        assert!(validate_unit(&"u".repeat(33)).is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        /// Positive quantities always validate, non-positive never do
        #[test]
        fn prop_quantity_sign_decides(n in -100000i64..=100000) {
            let quantity = Decimal::new(n, 2);
            let result = validate_positive_quantity(quantity);
            prop_assert_eq!(result.is_ok(), quantity > Decimal::ZERO);
        }

        /// Price validity is decided by sign alone
        #[test]
        fn prop_price_sign_decides(n in -100000i64..=100000) {
            let price = Decimal::new(n, 2);
            let result = validate_unit_price(price);
            prop_assert_eq!(result.is_ok(), price >= Decimal::ZERO);
        }

        /// Markup validity matches the documented 0..=1000 range
        #[test]
        fn prop_markup_range(n in -2000i64..=2000) {
            let markup = Decimal::from(n);
            let result = validate_markup_percent(markup);
            prop_assert_eq!(
                result.is_ok(),
                markup >= Decimal::ZERO && markup <= Decimal::from(1000)
            );
        }
    }
}
