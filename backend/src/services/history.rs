//! Operation history service: append-only audit log
//!
//! Every mutating workflow writes an entry inside its own transaction, so the
//! audit trail commits or rolls back together with the business mutation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{OperationHistory, OperationType};

/// History service for reading the audit log
#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
}

/// A history entry to be appended
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub operation_type: OperationType,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub quantity: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub description: String,
    pub details: Option<serde_json::Value>,
}

/// Query filter for listing history
#[derive(Debug, Default, Deserialize)]
pub struct HistoryFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Internal row type; the operation type column is plain text
#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    organization_id: Uuid,
    user_id: Uuid,
    operation_type: String,
    entity_type: String,
    entity_id: Uuid,
    entity_name: String,
    quantity: Option<Decimal>,
    amount: Option<Decimal>,
    description: String,
    details: Option<serde_json::Value>,
    is_cancelled: bool,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_model(self) -> AppResult<OperationHistory> {
        let operation_type = OperationType::from_str(&self.operation_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown operation type: {}", self.operation_type))
        })?;
        Ok(OperationHistory {
            id: self.id,
            organization_id: self.organization_id,
            user_id: self.user_id,
            operation_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            quantity: self.quantity,
            amount: self.amount,
            description: self.description,
            details: self.details,
            is_cancelled: self.is_cancelled,
            created_at: self.created_at,
        })
    }
}

/// Append an operation history entry
///
/// Takes any executor so callers can pass their open transaction and keep the
/// audit write atomic with the mutation it describes.
pub async fn log_operation<'e, E>(
    executor: E,
    organization_id: Uuid,
    user_id: Uuid,
    entry: NewOperation,
) -> AppResult<Uuid>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO operation_history (
            organization_id, user_id, operation_type, entity_type, entity_id,
            entity_name, quantity, amount, description, details
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(entry.operation_type.as_str())
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.entity_name)
    .bind(entry.quantity)
    .bind(entry.amount)
    .bind(&entry.description)
    .bind(&entry.details)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Mark history entries for an entity as cancelled
pub async fn mark_cancelled<'e, E>(
    executor: E,
    organization_id: Uuid,
    entity_type: &str,
    entity_id: Uuid,
) -> AppResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE operation_history
        SET is_cancelled = true
        WHERE organization_id = $1 AND entity_type = $2 AND entity_id = $3
        "#,
    )
    .bind(organization_id)
    .bind(entity_type)
    .bind(entity_id)
    .execute(executor)
    .await?;

    Ok(())
}

impl HistoryService {
    /// Create a new HistoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List history entries for an organization, newest first
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: HistoryFilter,
    ) -> AppResult<Vec<OperationHistory>> {
        let limit = filter.limit.unwrap_or(100).clamp(1, 500);

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, organization_id, user_id, operation_type, entity_type, entity_id,
                   entity_name, quantity, amount, description, details, is_cancelled, created_at
            FROM operation_history
            WHERE organization_id = $1
              AND ($2::text IS NULL OR entity_type = $2)
              AND ($3::uuid IS NULL OR entity_id = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(organization_id)
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(HistoryRow::into_model).collect()
    }
}
