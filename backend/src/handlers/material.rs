//! HTTP handlers for material management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::material::{CreateMaterialInput, MaterialService, UpdateMaterialInput};
use crate::services::stock::MaterialStockSummary;
use crate::services::StockService;
use crate::AppState;
use shared::models::{Material, StockBalance};

/// Query parameters for listing materials
#[derive(Debug, Default, Deserialize)]
pub struct ListMaterialsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Create a material
pub async fn create_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMaterialInput>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    let material = service
        .create(current_user.0.organization_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(material))
}

/// List materials for the organization
pub async fn list_materials(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListMaterialsQuery>,
) -> AppResult<Json<Vec<Material>>> {
    let service = MaterialService::new(state.db);
    let materials = service
        .list(current_user.0.organization_id, query.include_archived)
        .await?;
    Ok(Json(materials))
}

/// Get a material by id
pub async fn get_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    let material = service
        .get(current_user.0.organization_id, material_id)
        .await?;
    Ok(Json(material))
}

/// Update a material
pub async fn update_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<UpdateMaterialInput>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    let material = service
        .update(
            current_user.0.organization_id,
            current_user.0.user_id,
            material_id,
            input,
        )
        .await?;
    Ok(Json(material))
}

/// Archive a material (soft delete)
pub async fn archive_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    let material = service
        .archive(
            current_user.0.organization_id,
            current_user.0.user_id,
            material_id,
        )
        .await?;
    Ok(Json(material))
}

/// Hard-delete a material that was never used
pub async fn delete_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = MaterialService::new(state.db);
    service
        .delete(
            current_user.0.organization_id,
            current_user.0.user_id,
            material_id,
        )
        .await?;
    Ok(Json(()))
}

/// Get the stock balance for a material
pub async fn get_material_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<StockBalance>> {
    let service = StockService::new(state.db);
    let balance = service
        .get_balance(current_user.0.organization_id, material_id)
        .await?;
    Ok(Json(balance))
}

/// List stock balances for all materials
pub async fn list_stock_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MaterialStockSummary>>> {
    let service = StockService::new(state.db);
    let balances = service.list_balances(current_user.0.organization_id).await?;
    Ok(Json(balances))
}

/// List materials below their minimum stock threshold
pub async fn list_low_stock_materials(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MaterialStockSummary>>> {
    let service = StockService::new(state.db);
    let materials = service
        .list_low_stock(current_user.0.organization_id)
        .await?;
    Ok(Json(materials))
}
