//! Production run and finished-goods models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A production run of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Production {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub production_date: NaiveDate,
    /// Batch number (e.g., "P20250107-003"), unique per organization
    pub batch_number: String,
    pub qr_payload: String,
    /// Cost per unit snapshotted at creation, never recomputed
    pub cost_per_unit: Decimal,
    pub total_cost: Decimal,
    pub recommended_price_per_unit: Option<Decimal>,
    pub comment: Option<String>,
    pub is_cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Status of an individual finished-goods unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishedProductStatus {
    InStock,
    Sold,
    WrittenOff,
}

impl FinishedProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishedProductStatus::InStock => "in_stock",
            FinishedProductStatus::Sold => "sold",
            FinishedProductStatus::WrittenOff => "written_off",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_stock" => Some(FinishedProductStatus::InStock),
            "sold" => Some(FinishedProductStatus::Sold),
            "written_off" => Some(FinishedProductStatus::WrittenOff),
            _ => None,
        }
    }

    /// Whether the unit may move from this status to `target`
    ///
    /// Legal cycle: `InStock -> {Sold, WrittenOff} -> InStock`.
    pub fn can_transition_to(&self, target: FinishedProductStatus) -> bool {
        use FinishedProductStatus::*;
        matches!(
            (self, target),
            (InStock, Sold) | (InStock, WrittenOff) | (Sold, InStock) | (WrittenOff, InStock)
        )
    }
}

impl std::fmt::Display for FinishedProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical produced unit, tracked from production through sale or write-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedProduct {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub production_id: Uuid,
    pub status: FinishedProductStatus,
    /// Copied from the production snapshot at creation
    pub cost_per_unit: Decimal,
    pub sale_price: Option<Decimal>,
    pub sale_date: Option<NaiveDate>,
    pub client_name: Option<String>,
    pub write_off_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate a batch number: "P" + date + per-organization daily sequence
pub fn generate_batch_number(date: NaiveDate, sequence: i32) -> String {
    format!("P{}-{:03}", date.format("%Y%m%d"), sequence)
}

/// Generate the pipe-delimited QR payload for a production batch
pub fn generate_qr_payload(
    batch_number: &str,
    product_id: Uuid,
    quantity: i32,
    date: NaiveDate,
) -> String {
    format!("{}|{}|{}|{}", batch_number, product_id, quantity, date.format("%Y-%m-%d"))
}
