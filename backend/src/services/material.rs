//! Material management service
//!
//! Materials are identified by (organization, name, color). Once a material
//! has receipts or recipe references it can only be archived, not removed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Material;
use crate::services::history::{log_operation, NewOperation};
use shared::models::OperationType;
use shared::validation::{validate_name, validate_unit};

/// Material service for managing raw materials
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Input for creating a material
#[derive(Debug, Deserialize)]
pub struct CreateMaterialInput {
    pub name: String,
    pub unit: String,
    pub color: Option<String>,
    pub category: Option<String>,
    pub min_stock: Option<Decimal>,
}

/// Input for updating a material
#[derive(Debug, Deserialize)]
pub struct UpdateMaterialInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub min_stock: Option<Decimal>,
}

/// Internal row type for material queries
#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    unit: String,
    color: Option<String>,
    category: Option<String>,
    min_stock: Option<Decimal>,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Material {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            unit: row.unit,
            color: row.color,
            category: row.category,
            min_stock: row.min_stock,
            is_archived: row.is_archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_MATERIAL: &str = r#"
    SELECT id, organization_id, name, unit, color, category, min_stock,
           is_archived, created_at, updated_at
    FROM materials
"#;

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a material
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateMaterialInput,
    ) -> AppResult<Material> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit(&input.unit).map_err(|msg| AppError::Validation {
            field: "unit".to_string(),
            message: msg.to_string(),
        })?;

        if let Some(min_stock) = input.min_stock {
            if min_stock < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "min_stock".to_string(),
                    message: "Minimum stock cannot be negative".to_string(),
                });
            }
        }

        // Identity is (organization, name, color)
        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM materials
                WHERE organization_id = $1 AND name = $2 AND color IS NOT DISTINCT FROM $3
            )
            "#,
        )
        .bind(organization_id)
        .bind(input.name.trim())
        .bind(&input.color)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("material name".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MaterialRow>(
            r#"
            INSERT INTO materials (organization_id, name, unit, color, category, min_stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, name, unit, color, category, min_stock,
                      is_archived, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(input.name.trim())
        .bind(input.unit.trim())
        .bind(&input.color)
        .bind(&input.category)
        .bind(input.min_stock)
        .fetch_one(&mut *tx)
        .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::MaterialCreated,
                entity_type: "material",
                entity_id: row.id,
                entity_name: row.name.clone(),
                quantity: None,
                amount: None,
                description: format!("Created material \"{}\"", row.name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// List materials for an organization
    pub async fn list(
        &self,
        organization_id: Uuid,
        include_archived: bool,
    ) -> AppResult<Vec<Material>> {
        let rows = sqlx::query_as::<_, MaterialRow>(&format!(
            "{} WHERE organization_id = $1 AND ($2 OR NOT is_archived) ORDER BY name, color",
            SELECT_MATERIAL
        ))
        .bind(organization_id)
        .bind(include_archived)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Material::from).collect())
    }

    /// Get a material by id
    pub async fn get(&self, organization_id: Uuid, material_id: Uuid) -> AppResult<Material> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            "{} WHERE id = $1 AND organization_id = $2",
            SELECT_MATERIAL
        ))
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        Ok(row.into())
    }

    /// Update a material
    pub async fn update(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        material_id: Uuid,
        input: UpdateMaterialInput,
    ) -> AppResult<Material> {
        let existing = self.get(organization_id, material_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let unit = input.unit.unwrap_or(existing.unit);
        let color = input.color.or(existing.color);
        let category = input.category.or(existing.category);
        let min_stock = input.min_stock.or(existing.min_stock);

        validate_name(&name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit(&unit).map_err(|msg| AppError::Validation {
            field: "unit".to_string(),
            message: msg.to_string(),
        })?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM materials
                WHERE organization_id = $1 AND name = $2 AND color IS NOT DISTINCT FROM $3
                  AND id <> $4
            )
            "#,
        )
        .bind(organization_id)
        .bind(name.trim())
        .bind(&color)
        .bind(material_id)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("material name".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MaterialRow>(
            r#"
            UPDATE materials
            SET name = $1, unit = $2, color = $3, category = $4, min_stock = $5,
                updated_at = NOW()
            WHERE id = $6 AND organization_id = $7
            RETURNING id, organization_id, name, unit, color, category, min_stock,
                      is_archived, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(unit.trim())
        .bind(&color)
        .bind(&category)
        .bind(min_stock)
        .bind(material_id)
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::MaterialUpdated,
                entity_type: "material",
                entity_id: row.id,
                entity_name: row.name.clone(),
                quantity: None,
                amount: None,
                description: format!("Updated material \"{}\"", row.name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Archive a material (soft delete)
    pub async fn archive(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<Material> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MaterialRow>(
            r#"
            UPDATE materials
            SET is_archived = true, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, unit, color, category, min_stock,
                      is_archived, created_at, updated_at
            "#,
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::MaterialArchived,
                entity_type: "material",
                entity_id: row.id,
                entity_name: row.name.clone(),
                quantity: None,
                amount: None,
                description: format!("Archived material \"{}\"", row.name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Hard-delete a material; only permitted if it was never used
    pub async fn delete(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<()> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM materials WHERE id = $1 AND organization_id = $2",
        )
        .bind(material_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let in_use = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM material_receipts WHERE material_id = $1)
                OR EXISTS(SELECT 1 FROM recipe_items WHERE material_id = $1)
            "#,
        )
        .bind(material_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::Conflict(
                "Material has receipts or recipe references; archive it instead".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM materials WHERE id = $1 AND organization_id = $2")
            .bind(material_id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::MaterialDeleted,
                entity_type: "material",
                entity_id: material_id,
                entity_name: name.clone(),
                quantity: None,
                amount: None,
                description: format!("Deleted material \"{}\"", name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
