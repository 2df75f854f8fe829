//! Stock ledger service
//!
//! Balances are derived entirely from receipt and write-off rows; the ledger
//! itself holds no state and is safe to query concurrently. Valuation uses the
//! FIFO-remainder-weighted math in `shared::allocation`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ReceiptLot, StockBalance};
use shared::allocation::{average_price, current_stock, remainder_value, round_money, round_quantity};

/// Stock service exposing the ledger contract
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Balance together with material identification, for list endpoints
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStockSummary {
    pub material_id: Uuid,
    pub name: String,
    pub unit: String,
    pub color: Option<String>,
    pub current_stock: Decimal,
    pub average_price: Decimal,
    pub total_value: Decimal,
    pub min_stock: Option<Decimal>,
    pub is_below_minimum: bool,
}

/// Row for lot queries: receipt plus its allocated sum
#[derive(Debug, FromRow)]
struct LotRow {
    receipt_id: Uuid,
    receipt_date: NaiveDate,
    quantity: Decimal,
    allocated: Decimal,
    unit_price: Decimal,
}

impl From<LotRow> for ReceiptLot {
    fn from(row: LotRow) -> Self {
        ReceiptLot {
            receipt_id: row.receipt_id,
            receipt_date: row.receipt_date,
            quantity: row.quantity,
            allocated: row.allocated,
            unit_price: row.unit_price,
        }
    }
}

/// Load the receipt lots of a material in FIFO order, without locking
pub(crate) async fn load_lots<'e, E>(
    executor: E,
    organization_id: Uuid,
    material_id: Uuid,
) -> AppResult<Vec<ReceiptLot>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, LotRow>(
        r#"
        SELECT r.id AS receipt_id, r.receipt_date, r.quantity,
               COALESCE(SUM(w.quantity), 0) AS allocated,
               r.unit_price
        FROM material_receipts r
        LEFT JOIN material_write_offs w ON w.receipt_id = r.id
        WHERE r.material_id = $1 AND r.organization_id = $2
        GROUP BY r.id, r.receipt_date, r.quantity, r.unit_price
        ORDER BY r.receipt_date ASC, r.id ASC
        "#,
    )
    .bind(material_id)
    .bind(organization_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(ReceiptLot::from).collect())
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get the stock balance for a material
    pub async fn get_balance(
        &self,
        organization_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<StockBalance> {
        let min_stock = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT min_stock FROM materials WHERE id = $1 AND organization_id = $2",
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let lots = load_lots(&self.db, organization_id, material_id).await?;
        let stock = round_quantity(current_stock(&lots));

        if stock < Decimal::ZERO {
            // Should be unreachable if the allocator is correct
            tracing::error!(
                material_id = %material_id,
                stock = %stock,
                "negative computed stock, ledger is inconsistent"
            );
            return Err(AppError::Internal(format!(
                "Negative stock computed for material {}",
                material_id
            )));
        }

        Ok(StockBalance {
            material_id,
            current_stock: stock,
            average_price: average_price(&lots),
            total_value: round_money(remainder_value(&lots)),
            is_below_minimum: min_stock.map_or(false, |min| stock < min),
        })
    }

    /// List balances for all non-archived materials of an organization
    pub async fn list_balances(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<MaterialStockSummary>> {
        let materials = sqlx::query_as::<_, (Uuid, String, String, Option<String>, Option<Decimal>)>(
            r#"
            SELECT id, name, unit, color, min_stock
            FROM materials
            WHERE organization_id = $1 AND NOT is_archived
            ORDER BY name, color
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        let mut summaries = Vec::with_capacity(materials.len());
        for (id, name, unit, color, min_stock) in materials {
            let lots = load_lots(&self.db, organization_id, id).await?;
            let stock = round_quantity(current_stock(&lots));
            summaries.push(MaterialStockSummary {
                material_id: id,
                name,
                unit,
                color,
                current_stock: stock,
                average_price: average_price(&lots),
                total_value: round_money(remainder_value(&lots)),
                min_stock,
                is_below_minimum: min_stock.map_or(false, |min| stock < min),
            });
        }

        Ok(summaries)
    }

    /// List materials whose stock is below their minimum threshold
    pub async fn list_low_stock(
        &self,
        organization_id: Uuid,
    ) -> AppResult<Vec<MaterialStockSummary>> {
        let balances = self.list_balances(organization_id).await?;
        Ok(balances
            .into_iter()
            .filter(|b| b.is_below_minimum)
            .collect())
    }
}
