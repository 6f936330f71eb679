use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{agent, audit, gate, handlers, inventory, treasury, users};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Inventory administration
        .route("/inventory", get(inventory::list))
        .route("/inventory/seed", post(inventory::seed))
        .route("/inventory/assign", post(inventory::assign))
        .route("/inventory/reset", post(inventory::reset))
        .route("/inventory/{id}", get(inventory::get))
        .route("/inventory/{id}", patch(inventory::edit))
        .route("/inventory/{id}/ban", post(inventory::ban))
        // Agent operations
        .route("/agent/sell", post(agent::sell))
        .route("/agent/transfer", post(agent::transfer))
        .route("/agent/wallet", get(agent::wallet))
        // Treasury
        .route("/treasury/agents", get(treasury::agents))
        .route("/treasury/settle", post(treasury::settle))
        // Gate
        .route("/gate/scan", post(gate::scan))
        // Users
        .route("/users", get(users::list))
        .route("/users", post(users::create))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            super::middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(super::middleware::metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
