//! Material receipt service
//!
//! Receipts are the FIFO lots of the stock ledger. Once write-offs reference a
//! receipt its quantity may never drop below the allocated amount and it can
//! no longer be moved to a different material.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::MaterialReceipt;
use crate::services::history::{log_operation, NewOperation};
use shared::models::OperationType;
use shared::validation::{validate_positive_quantity, validate_unit_price};

/// Receipt service for managing material lots
#[derive(Clone)]
pub struct ReceiptService {
    db: PgPool,
}

/// Input for recording a receipt
#[derive(Debug, Deserialize)]
pub struct CreateReceiptInput {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub receipt_date: Option<NaiveDate>,
    pub batch_note: Option<String>,
}

/// Input for updating a receipt
#[derive(Debug, Deserialize)]
pub struct UpdateReceiptInput {
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub receipt_date: Option<NaiveDate>,
    pub batch_note: Option<String>,
    pub material_id: Option<Uuid>,
}

/// Internal row type for receipt queries
#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    organization_id: Uuid,
    material_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    receipt_date: NaiveDate,
    batch_note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReceiptRow> for MaterialReceipt {
    fn from(row: ReceiptRow) -> Self {
        MaterialReceipt {
            id: row.id,
            organization_id: row.organization_id,
            material_id: row.material_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            receipt_date: row.receipt_date,
            batch_note: row.batch_note,
            created_at: row.created_at,
        }
    }
}

impl ReceiptService {
    /// Create a new ReceiptService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a material receipt
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        material_id: Uuid,
        input: CreateReceiptInput,
    ) -> AppResult<MaterialReceipt> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit_price(input.unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;

        let material_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM materials WHERE id = $1 AND organization_id = $2",
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let receipt_date = input.receipt_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ReceiptRow>(
            r#"
            INSERT INTO material_receipts (
                organization_id, material_id, quantity, unit_price, receipt_date, batch_note
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, material_id, quantity, unit_price,
                      receipt_date, batch_note, created_at
            "#,
        )
        .bind(organization_id)
        .bind(material_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(receipt_date)
        .bind(&input.batch_note)
        .fetch_one(&mut *tx)
        .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ReceiptAdded,
                entity_type: "material_receipt",
                entity_id: row.id,
                entity_name: material_name.clone(),
                quantity: Some(row.quantity),
                amount: Some(row.quantity * row.unit_price),
                description: format!(
                    "Received {} of \"{}\" at {}",
                    row.quantity, material_name, row.unit_price
                ),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// List receipts for a material, oldest first (FIFO order)
    pub async fn list(
        &self,
        organization_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<Vec<MaterialReceipt>> {
        let material_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1 AND organization_id = $2)",
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;

        if !material_exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let rows = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, organization_id, material_id, quantity, unit_price,
                   receipt_date, batch_note, created_at
            FROM material_receipts
            WHERE material_id = $1 AND organization_id = $2
            ORDER BY receipt_date ASC, id ASC
            "#,
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(MaterialReceipt::from).collect())
    }

    /// Update a receipt
    ///
    /// The quantity may never drop below the amount already consumed by
    /// write-offs, and a receipt with write-offs cannot change material.
    pub async fn update(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        receipt_id: Uuid,
        input: UpdateReceiptInput,
    ) -> AppResult<MaterialReceipt> {
        let existing = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, organization_id, material_id, quantity, unit_price,
                   receipt_date, batch_note, created_at
            FROM material_receipts
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(receipt_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        let allocated = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(quantity) FROM material_write_offs WHERE receipt_id = $1",
        )
        .bind(receipt_id)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(Decimal::ZERO);

        let quantity = input.quantity.unwrap_or(existing.quantity);
        let unit_price = input.unit_price.unwrap_or(existing.unit_price);
        let receipt_date = input.receipt_date.unwrap_or(existing.receipt_date);
        let batch_note = input.batch_note.or(existing.batch_note);
        let material_id = input.material_id.unwrap_or(existing.material_id);

        validate_positive_quantity(quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit_price(unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;

        if quantity < allocated {
            return Err(AppError::Conflict(format!(
                "Cannot reduce receipt quantity to {}: {} already written off",
                quantity, allocated
            )));
        }

        if material_id != existing.material_id {
            if allocated > Decimal::ZERO {
                return Err(AppError::Conflict(
                    "Cannot move a receipt with write-offs to another material".to_string(),
                ));
            }
            let material_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1 AND organization_id = $2)",
            )
            .bind(material_id)
            .bind(organization_id)
            .fetch_one(&self.db)
            .await?;
            if !material_exists {
                return Err(AppError::NotFound("Material".to_string()));
            }
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ReceiptRow>(
            r#"
            UPDATE material_receipts
            SET quantity = $1, unit_price = $2, receipt_date = $3, batch_note = $4,
                material_id = $5
            WHERE id = $6 AND organization_id = $7
            RETURNING id, organization_id, material_id, quantity, unit_price,
                      receipt_date, batch_note, created_at
            "#,
        )
        .bind(quantity)
        .bind(unit_price)
        .bind(receipt_date)
        .bind(&batch_note)
        .bind(material_id)
        .bind(receipt_id)
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ReceiptUpdated,
                entity_type: "material_receipt",
                entity_id: row.id,
                entity_name: row.id.to_string(),
                quantity: Some(row.quantity),
                amount: Some(row.quantity * row.unit_price),
                description: "Updated material receipt".to_string(),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Delete a receipt; only permitted while no write-off references it
    pub async fn delete(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        receipt_id: Uuid,
    ) -> AppResult<()> {
        let existing = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, organization_id, material_id, quantity, unit_price,
                   receipt_date, batch_note, created_at
            FROM material_receipts
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(receipt_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        let allocated = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM material_write_offs WHERE receipt_id = $1)",
        )
        .bind(receipt_id)
        .fetch_one(&self.db)
        .await?;

        if allocated {
            return Err(AppError::Conflict(
                "Receipt has write-offs and cannot be deleted".to_string(),
            ));
        }

        let material_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM materials WHERE id = $1 AND organization_id = $2",
        )
        .bind(existing.material_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM material_receipts WHERE id = $1 AND organization_id = $2")
            .bind(receipt_id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ReceiptDeleted,
                entity_type: "material_receipt",
                entity_id: receipt_id,
                entity_name: material_name.clone(),
                quantity: Some(existing.quantity),
                amount: Some(existing.quantity * existing.unit_price),
                description: format!(
                    "Deleted receipt of {} of \"{}\"",
                    existing.quantity, material_name
                ),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
