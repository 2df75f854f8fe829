//! Finished-goods service
//!
//! Each row is one physical produced unit. Units cycle between in-stock and
//! sold/written-off; returning a unit to stock clears its sale or write-off
//! fields so the row looks exactly as it did before the transition.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{FinishedProduct, FinishedProductStatus};
use crate::services::history::{log_operation, NewOperation};
use shared::models::OperationType;
use shared::validation::validate_unit_price;

/// Finished-goods service for sale, write-off and return-to-stock
#[derive(Clone)]
pub struct FinishedProductService {
    db: PgPool,
}

/// Query filter for listing finished products
#[derive(Debug, Default, Deserialize)]
pub struct FinishedProductFilter {
    pub production_id: Option<Uuid>,
    pub status: Option<FinishedProductStatus>,
}

/// Input for selling a unit
#[derive(Debug, Deserialize)]
pub struct SellInput {
    pub sale_price: Decimal,
    pub sale_date: Option<NaiveDate>,
    pub client_name: Option<String>,
}

/// Input for writing off a unit
#[derive(Debug, Deserialize)]
pub struct WriteOffInput {
    pub reason: String,
}

/// Internal row type; status is stored as text
#[derive(Debug, FromRow)]
struct FinishedProductRow {
    id: Uuid,
    organization_id: Uuid,
    production_id: Uuid,
    status: String,
    cost_per_unit: Decimal,
    sale_price: Option<Decimal>,
    sale_date: Option<NaiveDate>,
    client_name: Option<String>,
    write_off_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FinishedProductRow {
    fn into_model(self) -> AppResult<FinishedProduct> {
        let status = FinishedProductStatus::from_str(&self.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown finished product status: {}", self.status))
        })?;
        Ok(FinishedProduct {
            id: self.id,
            organization_id: self.organization_id,
            production_id: self.production_id,
            status,
            cost_per_unit: self.cost_per_unit,
            sale_price: self.sale_price,
            sale_date: self.sale_date,
            client_name: self.client_name,
            write_off_reason: self.write_off_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_FINISHED: &str = r#"
    SELECT id, organization_id, production_id, status, cost_per_unit, sale_price,
           sale_date, client_name, write_off_reason, created_at, updated_at
    FROM finished_products
"#;

impl FinishedProductService {
    /// Create a new FinishedProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List finished products, optionally filtered by production or status
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: FinishedProductFilter,
    ) -> AppResult<Vec<FinishedProduct>> {
        let rows = sqlx::query_as::<_, FinishedProductRow>(&format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR production_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            "#,
            SELECT_FINISHED
        ))
        .bind(organization_id)
        .bind(filter.production_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FinishedProductRow::into_model).collect()
    }

    /// Get a finished product by id
    pub async fn get(&self, organization_id: Uuid, unit_id: Uuid) -> AppResult<FinishedProduct> {
        let row = sqlx::query_as::<_, FinishedProductRow>(&format!(
            "{} WHERE id = $1 AND organization_id = $2",
            SELECT_FINISHED
        ))
        .bind(unit_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Finished product".to_string()))?;

        row.into_model()
    }

    /// Sell a unit: InStock -> Sold
    pub async fn sell(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        unit_id: Uuid,
        input: SellInput,
    ) -> AppResult<FinishedProduct> {
        validate_unit_price(input.sale_price).map_err(|msg| AppError::Validation {
            field: "sale_price".to_string(),
            message: msg.to_string(),
        })?;

        let existing = self.get(organization_id, unit_id).await?;
        self.check_transition(existing.status, FinishedProductStatus::Sold)?;

        let sale_date = input.sale_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        // The status predicate re-checks against the row's latest committed
        // version; a transition that raced past the read above matches nothing.
        let row = sqlx::query_as::<_, FinishedProductRow>(
            r#"
            UPDATE finished_products
            SET status = 'sold', sale_price = $1, sale_date = $2, client_name = $3,
                updated_at = NOW()
            WHERE id = $4 AND organization_id = $5 AND status = 'in_stock'
            RETURNING id, organization_id, production_id, status, cost_per_unit, sale_price,
                      sale_date, client_name, write_off_reason, created_at, updated_at
            "#,
        )
        .bind(input.sale_price)
        .bind(sale_date)
        .bind(&input.client_name)
        .bind(unit_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(
                "Unit is no longer in stock and cannot be sold".to_string(),
            )
        })?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::FinishedProductSold,
                entity_type: "finished_product",
                entity_id: unit_id,
                entity_name: unit_id.to_string(),
                quantity: Some(Decimal::ONE),
                amount: Some(input.sale_price),
                description: format!("Sold unit for {}", input.sale_price),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        row.into_model()
    }

    /// Write off a unit: InStock -> WrittenOff
    pub async fn write_off(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        unit_id: Uuid,
        input: WriteOffInput,
    ) -> AppResult<FinishedProduct> {
        if input.reason.trim().is_empty() {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: "Write-off reason cannot be empty".to_string(),
            });
        }

        let existing = self.get(organization_id, unit_id).await?;
        self.check_transition(existing.status, FinishedProductStatus::WrittenOff)?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, FinishedProductRow>(
            r#"
            UPDATE finished_products
            SET status = 'written_off', write_off_reason = $1, updated_at = NOW()
            WHERE id = $2 AND organization_id = $3 AND status = 'in_stock'
            RETURNING id, organization_id, production_id, status, cost_per_unit, sale_price,
                      sale_date, client_name, write_off_reason, created_at, updated_at
            "#,
        )
        .bind(input.reason.trim())
        .bind(unit_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(
                "Unit is no longer in stock and cannot be written off".to_string(),
            )
        })?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::FinishedProductWrittenOff,
                entity_type: "finished_product",
                entity_id: unit_id,
                entity_name: unit_id.to_string(),
                quantity: Some(Decimal::ONE),
                amount: Some(existing.cost_per_unit),
                description: format!("Wrote off unit: {}", input.reason.trim()),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        row.into_model()
    }

    /// Return a unit to stock: {Sold, WrittenOff} -> InStock
    ///
    /// Clears the sale and write-off fields recorded by the prior transition.
    pub async fn return_to_stock(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        unit_id: Uuid,
    ) -> AppResult<FinishedProduct> {
        let existing = self.get(organization_id, unit_id).await?;
        self.check_transition(existing.status, FinishedProductStatus::InStock)?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, FinishedProductRow>(
            r#"
            UPDATE finished_products
            SET status = 'in_stock', sale_price = NULL, sale_date = NULL,
                client_name = NULL, write_off_reason = NULL, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND status IN ('sold', 'written_off')
            RETURNING id, organization_id, production_id, status, cost_per_unit, sale_price,
                      sale_date, client_name, write_off_reason, created_at, updated_at
            "#,
        )
        .bind(unit_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(
                "Unit is already in stock or was removed".to_string(),
            )
        })?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::FinishedProductReturned,
                entity_type: "finished_product",
                entity_id: unit_id,
                entity_name: unit_id.to_string(),
                quantity: Some(Decimal::ONE),
                amount: None,
                description: "Returned unit to stock".to_string(),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        row.into_model()
    }

    fn check_transition(
        &self,
        from: FinishedProductStatus,
        to: FinishedProductStatus,
    ) -> AppResult<()> {
        if !from.can_transition_to(to) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot change finished product status from {} to {}",
                from, to
            )));
        }
        Ok(())
    }
}
