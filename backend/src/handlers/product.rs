//! HTTP handlers for product and recipe endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::product::{
    CreateProductInput, ProductService, ProductWithRecipe, UpdateProductInput,
};
use crate::AppState;
use shared::models::Product;

/// Create a product with its recipe
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ProductWithRecipe>> {
    let service = ProductService::new(state.db);
    let product = service
        .create(current_user.0.organization_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(product))
}

/// List products for the organization
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list(current_user.0.organization_id).await?;
    Ok(Json(products))
}

/// Get a product with its recipe
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductWithRecipe>> {
    let service = ProductService::new(state.db);
    let product = service
        .get(current_user.0.organization_id, product_id)
        .await?;
    Ok(Json(product))
}

/// Update a product; a supplied recipe replaces the previous one
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ProductWithRecipe>> {
    let service = ProductService::new(state.db);
    let product = service
        .update(
            current_user.0.organization_id,
            current_user.0.user_id,
            product_id,
            input,
        )
        .await?;
    Ok(Json(product))
}

/// Recompute the cached cost fields from current material prices
pub async fn recalculate_product_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service
        .recalculate_cost(current_user.0.organization_id, product_id)
        .await?;
    Ok(Json(product))
}

/// Delete a product with no production runs
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service
        .delete(
            current_user.0.organization_id,
            current_user.0.user_id,
            product_id,
        )
        .await?;
    Ok(Json(()))
}
