//! HTTP handlers for finished-goods endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::finished_product::{
    FinishedProductFilter, FinishedProductService, SellInput, WriteOffInput,
};
use crate::AppState;
use shared::models::FinishedProduct;

/// List finished products, optionally filtered by production or status
pub async fn list_finished_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<FinishedProductFilter>,
) -> AppResult<Json<Vec<FinishedProduct>>> {
    let service = FinishedProductService::new(state.db);
    let units = service
        .list(current_user.0.organization_id, filter)
        .await?;
    Ok(Json(units))
}

/// Get a finished product by id
pub async fn get_finished_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
) -> AppResult<Json<FinishedProduct>> {
    let service = FinishedProductService::new(state.db);
    let unit = service.get(current_user.0.organization_id, unit_id).await?;
    Ok(Json(unit))
}

/// Sell a finished product
pub async fn sell_finished_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
    Json(input): Json<SellInput>,
) -> AppResult<Json<FinishedProduct>> {
    let service = FinishedProductService::new(state.db);
    let unit = service
        .sell(
            current_user.0.organization_id,
            current_user.0.user_id,
            unit_id,
            input,
        )
        .await?;
    Ok(Json(unit))
}

/// Write off a finished product
pub async fn write_off_finished_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
    Json(input): Json<WriteOffInput>,
) -> AppResult<Json<FinishedProduct>> {
    let service = FinishedProductService::new(state.db);
    let unit = service
        .write_off(
            current_user.0.organization_id,
            current_user.0.user_id,
            unit_id,
            input,
        )
        .await?;
    Ok(Json(unit))
}

/// Return a sold or written-off unit to stock
pub async fn return_finished_product_to_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(unit_id): Path<Uuid>,
) -> AppResult<Json<FinishedProduct>> {
    let service = FinishedProductService::new(state.db);
    let unit = service
        .return_to_stock(
            current_user.0.organization_id,
            current_user.0.user_id,
            unit_id,
        )
        .await?;
    Ok(Json(unit))
}
