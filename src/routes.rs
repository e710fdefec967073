use crate::handlers::{self, AppState};
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Every `/api` route except the health check.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/leads",
            get(handlers::list_leads).post(handlers::create_lead),
        )
        .route("/api/leads/stats", get(handlers::lead_stats))
        .route("/api/leads/analytics", get(handlers::lead_analytics))
        .route("/api/leads/board", get(handlers::lead_board))
        .route(
            "/api/leads/:id",
            get(handlers::get_lead)
                .put(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
        .route("/api/leads/:id/status", patch(handlers::change_lead_status))
        .route("/api/leads/:id/analyze", post(handlers::analyze_lead))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/groq/chat", post(handlers::groq_chat))
        .route("/api/groq/completion", post(handlers::groq_completion))
}

/// Full application without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    assemble(state, api_routes())
}

/// Adds the health check, state, tracing and CORS around `api`.
///
/// `api` is usually `api_routes()` with extra layers applied. The health
/// check stays outside those layers.
pub fn assemble(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
