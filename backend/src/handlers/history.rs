//! HTTP handlers for the operation history endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::history::{HistoryFilter, HistoryService};
use crate::AppState;
use shared::models::OperationHistory;

/// List operation history for the organization, newest first
pub async fn list_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<HistoryFilter>,
) -> AppResult<Json<Vec<OperationHistory>>> {
    let service = HistoryService::new(state.db);
    let entries = service
        .list(current_user.0.organization_id, filter)
        .await?;
    Ok(Json(entries))
}
