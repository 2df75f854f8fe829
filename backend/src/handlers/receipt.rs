//! HTTP handlers for material receipt endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::receipt::{CreateReceiptInput, ReceiptService, UpdateReceiptInput};
use crate::AppState;
use shared::models::MaterialReceipt;

/// Record a receipt for a material
pub async fn create_receipt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<CreateReceiptInput>,
) -> AppResult<Json<MaterialReceipt>> {
    let service = ReceiptService::new(state.db);
    let receipt = service
        .create(
            current_user.0.organization_id,
            current_user.0.user_id,
            material_id,
            input,
        )
        .await?;
    Ok(Json(receipt))
}

/// List receipts for a material in FIFO order
pub async fn list_material_receipts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Vec<MaterialReceipt>>> {
    let service = ReceiptService::new(state.db);
    let receipts = service
        .list(current_user.0.organization_id, material_id)
        .await?;
    Ok(Json(receipts))
}

/// Update a receipt
pub async fn update_receipt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(receipt_id): Path<Uuid>,
    Json(input): Json<UpdateReceiptInput>,
) -> AppResult<Json<MaterialReceipt>> {
    let service = ReceiptService::new(state.db);
    let receipt = service
        .update(
            current_user.0.organization_id,
            current_user.0.user_id,
            receipt_id,
            input,
        )
        .await?;
    Ok(Json(receipt))
}

/// Delete an unallocated receipt
pub async fn delete_receipt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ReceiptService::new(state.db);
    service
        .delete(
            current_user.0.organization_id,
            current_user.0.user_id,
            receipt_id,
        )
        .await?;
    Ok(Json(()))
}
