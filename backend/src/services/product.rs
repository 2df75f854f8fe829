//! Product and recipe service
//!
//! Recipe updates use replace-on-update semantics: the full set of recipe
//! items is deleted and re-inserted in one transaction, so partial diffs can
//! never leave stale quantities behind. Cached cost fields are recomputed only
//! through an explicit call, never as a side effect of saving.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{recommended_price, Product, RecipeItem};
use crate::services::history::{log_operation, NewOperation};
use crate::services::stock::load_lots;
use shared::allocation::{average_price, round_money};
use shared::models::OperationType;
use shared::validation::{validate_markup_percent, validate_name, validate_positive_quantity};

/// Product service for managing products and their recipes
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// One recipe line in a create/update request
#[derive(Debug, Deserialize)]
pub struct RecipeItemInput {
    pub material_id: Uuid,
    pub quantity_per_unit: Decimal,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub category: Option<String>,
    pub weight: Option<Decimal>,
    pub markup_percent: Option<Decimal>,
    pub recipe: Vec<RecipeItemInput>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub weight: Option<Decimal>,
    pub markup_percent: Option<Decimal>,
    /// When present, replaces the entire recipe
    pub recipe: Option<Vec<RecipeItemInput>>,
}

/// Product together with its recipe lines
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithRecipe {
    #[serde(flatten)]
    pub product: Product,
    pub recipe: Vec<RecipeItem>,
}

/// Internal row type for product queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    category: Option<String>,
    weight: Option<Decimal>,
    markup_percent: Decimal,
    estimated_cost: Option<Decimal>,
    recommended_price: Option<Decimal>,
    cost_calculated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            category: row.category,
            weight: row.weight,
            markup_percent: row.markup_percent,
            estimated_cost: row.estimated_cost,
            recommended_price: row.recommended_price,
            cost_calculated_at: row.cost_calculated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, organization_id, name, category, weight, markup_percent,
           estimated_cost, recommended_price, cost_calculated_at, created_at, updated_at
    FROM products
"#;

fn validate_recipe(recipe: &[RecipeItemInput]) -> AppResult<()> {
    if recipe.is_empty() {
        return Err(AppError::Validation {
            field: "recipe".to_string(),
            message: "Recipe must contain at least one material".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for item in recipe {
        validate_positive_quantity(item.quantity_per_unit).map_err(|msg| {
            AppError::Validation {
                field: "recipe.quantity_per_unit".to_string(),
                message: msg.to_string(),
            }
        })?;
        if !seen.insert(item.material_id) {
            return Err(AppError::Validation {
                field: "recipe".to_string(),
                message: "Recipe lists the same material twice".to_string(),
            });
        }
    }

    Ok(())
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product with its recipe
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<ProductWithRecipe> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let markup_percent = input.markup_percent.unwrap_or(Decimal::ZERO);
        validate_markup_percent(markup_percent).map_err(|msg| AppError::Validation {
            field: "markup_percent".to_string(),
            message: msg.to_string(),
        })?;

        validate_recipe(&input.recipe)?;
        self.check_materials_exist(organization_id, &input.recipe)
            .await?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (organization_id, name, category, weight, markup_percent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, name, category, weight, markup_percent,
                      estimated_cost, recommended_price, cost_calculated_at,
                      created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(input.weight)
        .bind(markup_percent)
        .fetch_one(&mut *tx)
        .await?;

        let mut recipe = Vec::with_capacity(input.recipe.len());
        for item in &input.recipe {
            sqlx::query(
                r#"
                INSERT INTO recipe_items (product_id, material_id, quantity_per_unit)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(row.id)
            .bind(item.material_id)
            .bind(item.quantity_per_unit)
            .execute(&mut *tx)
            .await?;

            recipe.push(RecipeItem {
                product_id: row.id,
                material_id: item.material_id,
                quantity_per_unit: item.quantity_per_unit,
            });
        }

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductCreated,
                entity_type: "product",
                entity_id: row.id,
                entity_name: row.name.clone(),
                quantity: None,
                amount: None,
                description: format!("Created product \"{}\"", row.name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(ProductWithRecipe {
            product: row.into(),
            recipe,
        })
    }

    /// List products for an organization
    pub async fn list(&self, organization_id: Uuid) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{} WHERE organization_id = $1 ORDER BY name",
            SELECT_PRODUCT
        ))
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product with its recipe
    pub async fn get(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<ProductWithRecipe> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{} WHERE id = $1 AND organization_id = $2",
            SELECT_PRODUCT
        ))
        .bind(product_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let recipe = self.get_recipe(organization_id, product_id).await?;

        Ok(ProductWithRecipe {
            product: row.into(),
            recipe,
        })
    }

    /// Get the recipe lines for a product
    pub async fn get_recipe(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<RecipeItem>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            r#"
            SELECT ri.product_id, ri.material_id, ri.quantity_per_unit
            FROM recipe_items ri
            JOIN products p ON p.id = ri.product_id
            WHERE ri.product_id = $1 AND p.organization_id = $2
            ORDER BY ri.material_id
            "#,
        )
        .bind(product_id)
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, material_id, quantity_per_unit)| RecipeItem {
                product_id,
                material_id,
                quantity_per_unit,
            })
            .collect())
    }

    /// Update a product; a supplied recipe replaces the previous one entirely
    pub async fn update(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductWithRecipe> {
        let existing = self.get(organization_id, product_id).await?;

        let name = input.name.unwrap_or(existing.product.name);
        let category = input.category.or(existing.product.category);
        let weight = input.weight.or(existing.product.weight);
        let markup_percent = input.markup_percent.unwrap_or(existing.product.markup_percent);

        validate_name(&name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_markup_percent(markup_percent).map_err(|msg| AppError::Validation {
            field: "markup_percent".to_string(),
            message: msg.to_string(),
        })?;

        if let Some(recipe) = &input.recipe {
            validate_recipe(recipe)?;
            self.check_materials_exist(organization_id, recipe).await?;
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name = $1, category = $2, weight = $3, markup_percent = $4, updated_at = NOW()
            WHERE id = $5 AND organization_id = $6
            RETURNING id, organization_id, name, category, weight, markup_percent,
                      estimated_cost, recommended_price, cost_calculated_at,
                      created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&category)
        .bind(weight)
        .bind(markup_percent)
        .bind(product_id)
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;

        let recipe = if let Some(new_recipe) = input.recipe {
            // Replace the full recipe set atomically
            sqlx::query("DELETE FROM recipe_items WHERE product_id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;

            let mut recipe = Vec::with_capacity(new_recipe.len());
            for item in &new_recipe {
                sqlx::query(
                    r#"
                    INSERT INTO recipe_items (product_id, material_id, quantity_per_unit)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(product_id)
                .bind(item.material_id)
                .bind(item.quantity_per_unit)
                .execute(&mut *tx)
                .await?;

                recipe.push(RecipeItem {
                    product_id,
                    material_id: item.material_id,
                    quantity_per_unit: item.quantity_per_unit,
                });
            }
            recipe
        } else {
            existing.recipe
        };

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductUpdated,
                entity_type: "product",
                entity_id: row.id,
                entity_name: row.name.clone(),
                quantity: None,
                amount: None,
                description: format!("Updated product \"{}\"", row.name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(ProductWithRecipe {
            product: row.into(),
            recipe,
        })
    }

    /// Recompute the cached cost fields from current material average prices
    ///
    /// Estimated cost is the sum of recipe line costs at each material's
    /// FIFO-remainder-weighted average price; the recommended price adds the
    /// markup on top. Until this is called the cached fields may legitimately
    /// lag behind price changes.
    pub async fn recalculate_cost(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Product> {
        let recipe = self.get_recipe(organization_id, product_id).await?;
        if recipe.is_empty() {
            // get_recipe does not distinguish missing product from empty recipe
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND organization_id = $2)",
            )
            .bind(product_id)
            .bind(organization_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Product".to_string()));
            }
        }

        let mut estimated_cost = Decimal::ZERO;
        for item in &recipe {
            let lots = load_lots(&self.db, organization_id, item.material_id).await?;
            estimated_cost += item.quantity_per_unit * average_price(&lots);
        }
        let estimated_cost = round_money(estimated_cost);

        let markup_percent = sqlx::query_scalar::<_, Decimal>(
            "SELECT markup_percent FROM products WHERE id = $1 AND organization_id = $2",
        )
        .bind(product_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;

        let price = round_money(recommended_price(estimated_cost, markup_percent));

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET estimated_cost = $1, recommended_price = $2, cost_calculated_at = NOW(),
                updated_at = NOW()
            WHERE id = $3 AND organization_id = $4
            RETURNING id, organization_id, name, category, weight, markup_percent,
                      estimated_cost, recommended_price, cost_calculated_at,
                      created_at, updated_at
            "#,
        )
        .bind(estimated_cost)
        .bind(price)
        .bind(product_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Delete a product; only permitted while no production references it
    pub async fn delete(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<()> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM products WHERE id = $1 AND organization_id = $2",
        )
        .bind(product_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM productions WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if in_use {
            return Err(AppError::Conflict(
                "Product has production runs and cannot be deleted".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM recipe_items WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM products WHERE id = $1 AND organization_id = $2")
            .bind(product_id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;

        log_operation(
            &mut *tx,
            organization_id,
            user_id,
            NewOperation {
                operation_type: OperationType::ProductDeleted,
                entity_type: "product",
                entity_id: product_id,
                entity_name: name.clone(),
                quantity: None,
                amount: None,
                description: format!("Deleted product \"{}\"", name),
                details: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn check_materials_exist(
        &self,
        organization_id: Uuid,
        recipe: &[RecipeItemInput],
    ) -> AppResult<()> {
        for item in recipe {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1 AND organization_id = $2)",
            )
            .bind(item.material_id)
            .bind(organization_id)
            .fetch_one(&self.db)
            .await?;

            if !exists {
                return Err(AppError::NotFound("Material".to_string()));
            }
        }
        Ok(())
    }
}
