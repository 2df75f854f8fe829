//! Product and recipe models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A manufactured product with its bill-of-materials recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    /// Finished weight of a single unit, informational
    pub weight: Option<Decimal>,
    pub markup_percent: Decimal,
    /// Cached material cost per unit; recomputed only on demand
    pub estimated_cost: Option<Decimal>,
    /// Cached sale price: estimated cost plus markup
    pub recommended_price: Option<Decimal>,
    pub cost_calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recipe line: material quantity required per single produced unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItem {
    pub product_id: Uuid,
    pub material_id: Uuid,
    pub quantity_per_unit: Decimal,
}

/// Recommended price from an estimated cost and markup percent
pub fn recommended_price(estimated_cost: Decimal, markup_percent: Decimal) -> Decimal {
    estimated_cost * (Decimal::ONE + markup_percent / Decimal::from(100))
}
