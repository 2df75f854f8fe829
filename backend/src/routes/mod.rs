//! Route definitions for the Workshop Inventory Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - material and stock management
        .nest("/materials", material_routes())
        // Protected routes - receipt management
        .nest("/receipts", receipt_routes())
        // Protected routes - product and recipe management
        .nest("/products", product_routes())
        // Protected routes - production management
        .nest("/productions", production_routes())
        // Protected routes - finished goods
        .nest("/finished-products", finished_product_routes())
        // Protected routes - operation history
        .nest("/history", history_routes())
}

/// Material management routes (protected)
fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_materials).post(handlers::create_material))
        .route("/balances", get(handlers::list_stock_balances))
        .route("/low-stock", get(handlers::list_low_stock_materials))
        .route(
            "/:material_id",
            get(handlers::get_material)
                .put(handlers::update_material)
                .delete(handlers::delete_material),
        )
        .route("/:material_id/archive", post(handlers::archive_material))
        .route("/:material_id/balance", get(handlers::get_material_balance))
        .route(
            "/:material_id/receipts",
            get(handlers::list_material_receipts).post(handlers::create_receipt),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Receipt management routes (protected)
fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:receipt_id",
            put(handlers::update_receipt).delete(handlers::delete_receipt),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product management routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/recalculate-cost",
            post(handlers::recalculate_product_cost),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Production management routes (protected)
fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_productions).post(handlers::create_production))
        .route("/check-availability", get(handlers::check_availability))
        .route(
            "/:production_id",
            get(handlers::get_production).delete(handlers::delete_production),
        )
        .route("/:production_id/cancel", post(handlers::cancel_production))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Finished goods routes (protected)
fn finished_product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_finished_products))
        .route("/:unit_id", get(handlers::get_finished_product))
        .route("/:unit_id/sell", post(handlers::sell_finished_product))
        .route("/:unit_id/write-off", post(handlers::write_off_finished_product))
        .route(
            "/:unit_id/return-to-stock",
            post(handlers::return_finished_product_to_stock),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Operation history routes (protected)
fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_history))
        .route_layer(middleware::from_fn(auth_middleware))
}
