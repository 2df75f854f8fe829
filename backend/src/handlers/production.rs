//! HTTP handlers for production endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::production::{
    AvailabilityQuery, AvailabilityReport, CreateProductionInput, ProductionService,
};
use crate::AppState;
use shared::models::Production;

/// Check whether a production run can be satisfied from current stock
pub async fn check_availability(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityReport>> {
    let service = ProductionService::new(state.db);
    let report = service
        .check_availability(current_user.0.organization_id, query)
        .await?;
    Ok(Json(report))
}

/// Create a production run
pub async fn create_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductionInput>,
) -> AppResult<Json<Production>> {
    let service = ProductionService::new(state.db);
    let production = service
        .create(current_user.0.organization_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(production))
}

/// List production runs for the organization
pub async fn list_productions(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Production>>> {
    let service = ProductionService::new(state.db);
    let productions = service.list(current_user.0.organization_id).await?;
    Ok(Json(productions))
}

/// Get a production run by id
pub async fn get_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<Production>> {
    let service = ProductionService::new(state.db);
    let production = service
        .get(current_user.0.organization_id, production_id)
        .await?;
    Ok(Json(production))
}

/// Cancel a production run, returning consumed materials to stock
pub async fn cancel_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<Production>> {
    let service = ProductionService::new(state.db);
    let production = service
        .cancel(
            current_user.0.organization_id,
            current_user.0.user_id,
            production_id,
        )
        .await?;
    Ok(Json(production))
}

/// Hard-delete a production run
pub async fn delete_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductionService::new(state.db);
    service
        .delete(
            current_user.0.organization_id,
            current_user.0.user_id,
            production_id,
        )
        .await?;
    Ok(Json(()))
}
