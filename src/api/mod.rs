pub mod handlers;

pub use handlers::*;

use crate::db::LedgerStore;
use crate::service::ReconcileService;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// 构建路由
pub fn router<S: LedgerStore + 'static>(service: Arc<ReconcileService<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/reconcile/auto", post(auto_reconcile::<S>))
        .route("/api/matches", post(create_manual_match::<S>))
        .route("/api/matches/preview", post(preview_score::<S>))
        .route("/api/matches/:id", delete(undo_match::<S>))
        .route("/api/accounts/:id/matches", get(list_matches::<S>))
        .route("/api/accounts/:id/matches.csv", get(export_matches::<S>))
        .with_state(service)
}
