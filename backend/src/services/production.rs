//! Production workflow service
//!
//! Orchestrates production creation: availability check, per-day batch
//! numbering, FIFO material consumption, finished-goods materialization and
//! the audit entry, all inside one transaction. Also handles cancellation and
//! hard deletion, both of which fully reverse the material allocation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    generate_batch_number, generate_qr_payload, Production, ReceiptLot,
};
use crate::services::history::{log_operation, mark_cancelled, NewOperation};
use crate::services::product::ProductService;
use crate::services::stock::load_lots;
use shared::allocation::{
    allocation_cost, current_stock, plan_fifo_allocation, round_money, round_quantity,
};
use shared::models::OperationType;
use shared::validation::validate_production_quantity;

/// Production service for creating, cancelling and deleting production runs
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Input for creating a production run
#[derive(Debug, Deserialize)]
pub struct CreateProductionInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub production_date: Option<NaiveDate>,
    pub comment: Option<String>,
}

/// Query parameters for the availability check
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Availability of a single recipe line
#[derive(Debug, Clone, Serialize)]
pub struct MaterialAvailability {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub required: Decimal,
    pub available: Decimal,
    pub shortage: Decimal,
    pub sufficient: bool,
}

/// Result of the read-only availability simulation
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub can_produce: bool,
    /// Cached product cost, not recomputed from live lot prices here
    pub estimated_cost_per_unit: Option<Decimal>,
    pub materials: Vec<MaterialAvailability>,
    pub warnings: Vec<String>,
}

/// Internal row type for production queries
#[derive(Debug, FromRow)]
struct ProductionRow {
    id: Uuid,
    organization_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    production_date: NaiveDate,
    batch_number: String,
    qr_payload: String,
    cost_per_unit: Decimal,
    total_cost: Decimal,
    recommended_price_per_unit: Option<Decimal>,
    comment: Option<String>,
    is_cancelled: bool,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ProductionRow> for Production {
    fn from(row: ProductionRow) -> Self {
        Production {
            id: row.id,
            organization_id: row.organization_id,
            product_id: row.product_id,
            quantity: row.quantity,
            production_date: row.production_date,
            batch_number: row.batch_number,
            qr_payload: row.qr_payload,
            cost_per_unit: row.cost_per_unit,
            total_cost: row.total_cost,
            recommended_price_per_unit: row.recommended_price_per_unit,
            comment: row.comment,
            is_cancelled: row.is_cancelled,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
        }
    }
}

const SELECT_PRODUCTION: &str = r#"
    SELECT id, organization_id, product_id, quantity, production_date, batch_number,
           qr_payload, cost_per_unit, total_cost, recommended_price_per_unit, comment,
           is_cancelled, cancelled_at, created_at
    FROM productions
"#;

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check whether a production run can be satisfied from current stock
    ///
    /// Read-only simulation: creates no rows, reserves nothing, and gives the
    /// same answer when repeated with no intervening mutation. Concurrent
    /// consumers are handled by the commit-time re-validation in `create`.
    pub async fn check_availability(
        &self,
        organization_id: Uuid,
        query: AvailabilityQuery,
    ) -> AppResult<AvailabilityReport> {
        validate_production_quantity(query.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let products = ProductService::new(self.db.clone());
        let product = products.get(organization_id, query.product_id).await?;

        let quantity = Decimal::from(query.quantity);
        let mut materials = Vec::with_capacity(product.recipe.len());
        let mut warnings = Vec::new();
        let mut can_produce = true;

        for item in &product.recipe {
            let (name, unit) = sqlx::query_as::<_, (String, String)>(
                "SELECT name, unit FROM materials WHERE id = $1 AND organization_id = $2",
            )
            .bind(item.material_id)
            .bind(organization_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

            let lots = load_lots(&self.db, organization_id, item.material_id).await?;
            let available = round_quantity(current_stock(&lots));
            let required = round_quantity(item.quantity_per_unit * quantity);
            let shortage = (required - available).max(Decimal::ZERO);
            let sufficient = available >= required;

            if !sufficient {
                can_produce = false;
                warnings.push(format!(
                    "Not enough \"{}\": required {} {}, available {} {}",
                    name, required, unit, available, unit
                ));
            }

            materials.push(MaterialAvailability {
                material_id: item.material_id,
                material_name: name,
                unit,
                required,
                available,
                shortage,
                sufficient,
            });
        }

        if product.product.estimated_cost.is_none() {
            warnings.push("Product cost has not been calculated yet".to_string());
        }

        Ok(AvailabilityReport {
            can_produce,
            estimated_cost_per_unit: product.product.estimated_cost,
            materials,
            warnings,
        })
    }

    /// Create a production run
    ///
    /// All mutations happen in a single transaction: if any recipe line cannot
    /// be fully allocated the whole operation rolls back and no production,
    /// write-off or finished-goods rows remain.
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateProductionInput,
    ) -> AppResult<Production> {
        validate_production_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        // Advisory pre-check with a descriptive shortage error. The allocator
        // re-validates under row locks below, because stock may have been
        // consumed concurrently since this check.
        let report = self
            .check_availability(
                organization_id,
                AvailabilityQuery {
                    product_id: input.product_id,
                    quantity: input.quantity,
                },
            )
            .await?;

        if !report.can_produce {
            return Err(AppError::InsufficientStock(report.warnings.join("; ")));
        }

        let products = ProductService::new(self.db.clone());
        let product = products.get(organization_id, input.product_id).await?;
        let production_date = input
            .production_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        // Per-organization-per-day sequence via an atomic counter upsert; a
        // count query would leave a duplicate-number race window.
        let sequence = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO batch_counters (organization_id, day, value)
            VALUES ($1, $2, 1)
            ON CONFLICT (organization_id, day)
            DO UPDATE SET value = batch_counters.value + 1
            RETURNING value
            "#,
        )
        .bind(organization_id)
        .bind(production_date)
        .fetch_one(&mut *tx)
        .await?;

        let batch_number = generate_batch_number(production_date, sequence);
        let qr_payload = generate_qr_payload(
            &batch_number,
            input.product_id,
            input.quantity,
            production_date,
        );

        // Allocate every recipe line FIFO under row locks
        let quantity = Decimal::from(input.quantity);
        let mut total_cost = Decimal::ZERO;
        let mut planned: Vec<(Uuid, Vec<shared::allocation::AllocationLine>)> = Vec::new();

        for item in &product.recipe {
            let required = item.quantity_per_unit * quantity;
            let lots = lock_lots(&mut tx, organization_id, item.material_id).await?;

            let lines = plan_fifo_allocation(&lots, required).map_err(|shortage| {
                AppError::InsufficientStock(format!(
                    "Material {} has only {} available, {} required",
                    item.material_id, shortage.available, shortage.required
                ))
            })?;

            total_cost += allocation_cost(&lines);
            planned.push((item.material_id, lines));
        }

        let total_cost = round_money(total_cost);
        let cost_per_unit = round_money(total_cost / quantity);

        let row = sqlx::query_as::<_, ProductionRow>(
            r#"
            INSERT INTO productions (
                organization_id, product_id, quantity, production_date, batch_number,
                qr_payload, cost_per_unit, total_cost, recommended_price_per_unit, comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, organization_id, product_id, quantity, production_date, batch_number,
                      qr_payload, cost_per_unit, total_cost, recommended_price_per_unit,
                      comment, is_cancelled, cancelled_at, created_at
            "#,
        )
        .bind(organization_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(production_date)
        .bind(&batch_number)
        .bind(&qr_payload)
        .bind(cost_per_unit)
        .bind(total_cost)
        .bind(product.product.recommended_price)
        .bind(&input.comment)
        .fetch_one(&mut *tx)
        .await?;

        for (material_id, lines) in &planned {
            for line in lines {
                sqlx::query(
                    r#"
                    INSERT INTO material_write_offs (
                        organization_id, production_id, material_id, receipt_id,
                        quantity, unit_price
                    )
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(organization_id)
                .bind(row.id)
                .bind(material_id)
                .bind(line.receipt_id)
                .bind(line.quantity)
                .bind(line.unit_price)
                .execute(&mut *tx)
                .await?;
            }
        }

        // One finished-goods row per produced unit
        for _ in 0..input.quantity {
            sqlx::query(
                r#"
                INSERT INTO finished_products (
                    organization_id, production_id, status, cost_per_unit
                )
                VALUES ($1, $2, 'in_stock', $3)
                "#,
            )
            .bind(organization_id)
            .bind(row.id)
            .bind(cost_per_unit)
            .execute(&mut *tx)
            .await?;
        }

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductionCreated,
                entity_type: "production",
                entity_id: row.id,
                entity_name: batch_number.clone(),
                quantity: Some(quantity),
                amount: Some(total_cost),
                description: format!(
                    "Produced {} x \"{}\" (batch {})",
                    input.quantity, product.product.name, batch_number
                ),
                details: Some(serde_json::json!({
                    "product_id": input.product_id,
                    "cost_per_unit": cost_per_unit,
                    "total_cost": total_cost,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            production_id = %row.id,
            batch_number = %batch_number,
            "production created"
        );

        Ok(row.into())
    }

    /// List production runs for an organization, newest first
    pub async fn list(&self, organization_id: Uuid) -> AppResult<Vec<Production>> {
        let rows = sqlx::query_as::<_, ProductionRow>(&format!(
            "{} WHERE organization_id = $1 ORDER BY created_at DESC",
            SELECT_PRODUCTION
        ))
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Production::from).collect())
    }

    /// Get a production run by id
    pub async fn get(&self, organization_id: Uuid, production_id: Uuid) -> AppResult<Production> {
        let row = sqlx::query_as::<_, ProductionRow>(&format!(
            "{} WHERE id = $1 AND organization_id = $2",
            SELECT_PRODUCTION
        ))
        .bind(production_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        Ok(row.into())
    }

    /// Cancel a production run, returning consumed materials to stock
    ///
    /// Permitted only while every finished-goods unit is still in stock. The
    /// production row is kept (soft state) for audit continuity.
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        production_id: Uuid,
    ) -> AppResult<Production> {
        let mut tx = self.db.begin().await?;

        let production = self
            .lock_production(&mut tx, organization_id, production_id)
            .await?;

        if production.is_cancelled {
            return Err(AppError::Conflict("Production is already cancelled".to_string()));
        }

        self.guard_all_in_stock(&mut tx, production_id).await?;

        // Deleting the write-offs restores the receipt remainders; the ledger
        // is derived so no balance update is needed.
        sqlx::query("DELETE FROM material_write_offs WHERE production_id = $1")
            .bind(production_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM finished_products WHERE production_id = $1")
            .bind(production_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, ProductionRow>(
            r#"
            UPDATE productions
            SET is_cancelled = true, cancelled_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, product_id, quantity, production_date, batch_number,
                      qr_payload, cost_per_unit, total_cost, recommended_price_per_unit,
                      comment, is_cancelled, cancelled_at, created_at
            "#,
        )
        .bind(production_id)
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;

        mark_cancelled(&mut *tx, organization_id, "production", production_id).await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductionCancelled,
                entity_type: "production",
                entity_id: production_id,
                entity_name: row.batch_number.clone(),
                quantity: Some(Decimal::from(row.quantity)),
                amount: Some(row.total_cost),
                description: format!("Cancelled production batch {}", row.batch_number),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Hard-delete a production run and all its write-off/finished-goods rows
    pub async fn delete(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        production_id: Uuid,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let production = self
            .lock_production(&mut tx, organization_id, production_id)
            .await?;

        self.guard_all_in_stock(&mut tx, production_id).await?;

        sqlx::query("DELETE FROM material_write_offs WHERE production_id = $1")
            .bind(production_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM finished_products WHERE production_id = $1")
            .bind(production_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM productions WHERE id = $1 AND organization_id = $2")
            .bind(production_id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductionDeleted,
                entity_type: "production",
                entity_id: production_id,
                entity_name: production.batch_number.clone(),
                quantity: Some(Decimal::from(production.quantity)),
                amount: Some(production.total_cost),
                description: format!("Deleted production batch {}", production.batch_number),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn lock_production(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organization_id: Uuid,
        production_id: Uuid,
    ) -> AppResult<Production> {
        let row = sqlx::query_as::<_, ProductionRow>(&format!(
            "{} WHERE id = $1 AND organization_id = $2 FOR UPDATE",
            SELECT_PRODUCTION
        ))
        .bind(production_id)
        .bind(organization_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        Ok(row.into())
    }

    /// Fail if any finished-goods unit of this production has left stock
    async fn guard_all_in_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        production_id: Uuid,
    ) -> AppResult<()> {
        // Lock the children so a concurrent sell/write-off serializes against
        // this guard instead of committing between the count and the deletes.
        sqlx::query("SELECT id FROM finished_products WHERE production_id = $1 FOR UPDATE")
            .bind(production_id)
            .execute(&mut **tx)
            .await?;

        let non_returnable = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM finished_products
            WHERE production_id = $1 AND status <> 'in_stock'
            "#,
        )
        .bind(production_id)
        .fetch_one(&mut **tx)
        .await?;

        if non_returnable > 0 {
            return Err(AppError::Conflict(format!(
                "{} unit(s) have been sold or written off and cannot be returned",
                non_returnable
            )));
        }

        Ok(())
    }
}

/// Load the receipt lots of a material in FIFO order, locking the receipt rows
///
/// `FOR UPDATE` on the receipts serializes concurrent allocations of the same
/// material, so two transactions cannot both spend the same lot remainder.
async fn lock_lots(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    material_id: Uuid,
) -> AppResult<Vec<ReceiptLot>> {
    let receipts = sqlx::query_as::<_, (Uuid, NaiveDate, Decimal, Decimal)>(
        r#"
        SELECT id, receipt_date, quantity, unit_price
        FROM material_receipts
        WHERE material_id = $1 AND organization_id = $2
        ORDER BY receipt_date ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(material_id)
    .bind(organization_id)
    .fetch_all(&mut **tx)
    .await?;

    let allocated: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"
        SELECT receipt_id, COALESCE(SUM(quantity), 0)
        FROM material_write_offs
        WHERE material_id = $1
        GROUP BY receipt_id
        "#,
    )
    .bind(material_id)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .collect();

    Ok(receipts
        .into_iter()
        .map(|(id, receipt_date, quantity, unit_price)| ReceiptLot {
            receipt_id: id,
            receipt_date,
            quantity,
            allocated: allocated.get(&id).copied().unwrap_or(Decimal::ZERO),
            unit_price,
        })
        .collect())
}
