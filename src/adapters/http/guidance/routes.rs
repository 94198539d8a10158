//! HTTP routes for guidance endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{chat, course_detail, health, reload_catalog, review_cv, GuidanceAppState};

/// Chat, CV review, course lookup and health endpoints.
pub fn guidance_routes() -> Router<GuidanceAppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/cv", post(review_cv))
        .route("/courses/:id", get(course_detail))
        .route("/health", get(health))
}

/// Operator endpoints.
pub fn admin_routes() -> Router<GuidanceAppState> {
    Router::new().route("/admin/catalog/reload", post(reload_catalog))
}

/// Every guidance endpoint, ready for state.
pub fn guidance_router() -> Router<GuidanceAppState> {
    guidance_routes().merge(admin_routes())
}
