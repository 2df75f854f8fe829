//! Operation history tests
//!
//! Tests for the audit-log vocabulary including:
//! - A type for every mutating workflow, deletes and updates included
//! - Storage string round-tripping

use shared::models::OperationType;

const ALL_TYPES: [OperationType; 16] = [
    OperationType::MaterialCreated,
    OperationType::MaterialUpdated,
    OperationType::MaterialArchived,
    OperationType::MaterialDeleted,
    OperationType::ReceiptAdded,
    OperationType::ReceiptUpdated,
    OperationType::ReceiptDeleted,
    OperationType::ProductCreated,
    OperationType::ProductUpdated,
    OperationType::ProductDeleted,
    OperationType::ProductionCreated,
    OperationType::ProductionCancelled,
    OperationType::ProductionDeleted,
    OperationType::FinishedProductSold,
    OperationType::FinishedProductWrittenOff,
    OperationType::FinishedProductReturned,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Every operation type round-trips through its storage string
    #[test]
    fn test_operation_type_round_trip() {
        for op in ALL_TYPES {
            assert_eq!(OperationType::from_str(op.as_str()), Some(op));
        }
    }

    /// All storage strings are snake_case and distinct
    #[test]
    fn test_operation_type_strings() {
        let strings: Vec<&str> = ALL_TYPES.iter().map(|op| op.as_str()).collect();

        assert_eq!(strings.len(), 16);
        for s in &strings {
            assert!(s.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }

        let mut deduped = strings.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), strings.len());
    }

    /// Every entity lifecycle has its delete/update types, not just creation
    #[test]
    fn test_lifecycle_coverage() {
        assert_eq!(
            OperationType::from_str("material_updated"),
            Some(OperationType::MaterialUpdated)
        );
        assert_eq!(
            OperationType::from_str("material_deleted"),
            Some(OperationType::MaterialDeleted)
        );
        assert_eq!(
            OperationType::from_str("receipt_deleted"),
            Some(OperationType::ReceiptDeleted)
        );
        assert_eq!(
            OperationType::from_str("product_deleted"),
            Some(OperationType::ProductDeleted)
        );
    }

    /// Unknown storage strings are rejected
    #[test]
    fn test_unknown_operation_type_rejected() {
        assert_eq!(OperationType::from_str("material_removed"), None);
        assert_eq!(OperationType::from_str("MATERIAL_CREATED"), None);
        assert_eq!(OperationType::from_str(""), None);
    }
}
