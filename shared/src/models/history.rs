//! Operation history (audit log) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audited operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    MaterialCreated,
    MaterialUpdated,
    MaterialArchived,
    MaterialDeleted,
    ReceiptAdded,
    ReceiptUpdated,
    ReceiptDeleted,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    ProductionCreated,
    ProductionCancelled,
    ProductionDeleted,
    FinishedProductSold,
    FinishedProductWrittenOff,
    FinishedProductReturned,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::MaterialCreated => "material_created",
            OperationType::MaterialUpdated => "material_updated",
            OperationType::MaterialArchived => "material_archived",
            OperationType::MaterialDeleted => "material_deleted",
            OperationType::ReceiptAdded => "receipt_added",
            OperationType::ReceiptUpdated => "receipt_updated",
            OperationType::ReceiptDeleted => "receipt_deleted",
            OperationType::ProductCreated => "product_created",
            OperationType::ProductUpdated => "product_updated",
            OperationType::ProductDeleted => "product_deleted",
            OperationType::ProductionCreated => "production_created",
            OperationType::ProductionCancelled => "production_cancelled",
            OperationType::ProductionDeleted => "production_deleted",
            OperationType::FinishedProductSold => "finished_product_sold",
            OperationType::FinishedProductWrittenOff => "finished_product_written_off",
            OperationType::FinishedProductReturned => "finished_product_returned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "material_created" => Some(OperationType::MaterialCreated),
            "material_updated" => Some(OperationType::MaterialUpdated),
            "material_archived" => Some(OperationType::MaterialArchived),
            "material_deleted" => Some(OperationType::MaterialDeleted),
            "receipt_added" => Some(OperationType::ReceiptAdded),
            "receipt_updated" => Some(OperationType::ReceiptUpdated),
            "receipt_deleted" => Some(OperationType::ReceiptDeleted),
            "product_created" => Some(OperationType::ProductCreated),
            "product_updated" => Some(OperationType::ProductUpdated),
            "product_deleted" => Some(OperationType::ProductDeleted),
            "production_created" => Some(OperationType::ProductionCreated),
            "production_cancelled" => Some(OperationType::ProductionCancelled),
            "production_deleted" => Some(OperationType::ProductionDeleted),
            "finished_product_sold" => Some(OperationType::FinishedProductSold),
            "finished_product_written_off" => Some(OperationType::FinishedProductWrittenOff),
            "finished_product_returned" => Some(OperationType::FinishedProductReturned),
            _ => None,
        }
    }
}

/// Append-only audit row written by every mutating workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationHistory {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub operation_type: OperationType,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub quantity: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub description: String,
    pub details: Option<serde_json::Value>,
    /// Marks entries whose operation was later cancelled
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}
