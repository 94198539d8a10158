//! HTTP handlers for guidance endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::application::handlers::{
    HandleCvCommand, HandleCvHandler, HandleMessageCommand, HandleMessageError,
    HandleMessageHandler, ReloadCatalogHandler,
};
use crate::domain::catalog::{CatalogHandle, CourseId};
use crate::domain::foundation::{Language, SessionId};
use crate::domain::guidance::unavailable_message;

use super::dto::{
    ChatRequest, CourseDetailResponse, CvRequest, ErrorResponse, HealthResponse, ReloadResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════

/// Shared state for the guidance routes.
#[derive(Clone)]
pub struct GuidanceAppState {
    pub message_handler: Arc<HandleMessageHandler>,
    pub cv_handler: Arc<HandleCvHandler>,
    pub reload_handler: Arc<ReloadCatalogHandler>,
    pub catalog: Arc<CatalogHandle>,
}

impl GuidanceAppState {
    pub fn new(
        message_handler: Arc<HandleMessageHandler>,
        cv_handler: Arc<HandleCvHandler>,
        reload_handler: Arc<ReloadCatalogHandler>,
        catalog: Arc<CatalogHandle>,
    ) -> Self {
        Self {
            message_handler,
            cv_handler,
            reload_handler,
            catalog,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /chat - Run one conversational turn
pub async fn chat(State(state): State<GuidanceAppState>, Json(req): Json<ChatRequest>) -> Response {
    let session_id = match resolve_session(req.session_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let language = Language::detect(&req.message).unwrap_or_default();

    let cmd = HandleMessageCommand::new(session_id, req.message);
    match state.message_handler.handle(cmd).await {
        Ok(result) => (StatusCode::OK, Json(result.response)).into_response(),
        Err(e) => handle_guidance_error(e, language),
    }
}

/// POST /chat/cv - Review extracted CV text
pub async fn review_cv(State(state): State<GuidanceAppState>, Json(req): Json<CvRequest>) -> Response {
    let session_id = match resolve_session(req.session_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let language = Language::detect(&req.cv_text).unwrap_or_default();

    let cmd = HandleCvCommand {
        session_id,
        cv_text: req.cv_text,
        target_role: req.target_role,
    };
    match state.cv_handler.handle(cmd).await {
        Ok(result) => (StatusCode::OK, Json(result.response)).into_response(),
        Err(e) => handle_guidance_error(e, language),
    }
}

/// POST /admin/catalog/reload - Rebuild the catalog index from its source
pub async fn reload_catalog(State(state): State<GuidanceAppState>) -> Response {
    match state.reload_handler.handle().await {
        Ok(result) => (StatusCode::OK, Json(ReloadResponse::from(result))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::catalog_load_failed(e.to_string())),
        )
            .into_response(),
    }
}

/// GET /courses/:id - One course from the catalog being served
pub async fn course_detail(State(state): State<GuidanceAppState>, Path(id): Path<String>) -> Response {
    let snapshot = state.catalog.current();
    let course = CourseId::new(id.as_str()).ok().and_then(|id| snapshot.index.get(&id));
    match course {
        Some(course) => (StatusCode::OK, Json(CourseDetailResponse::from(course))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::course_not_found(id.trim())),
        )
            .into_response(),
    }
}

/// GET /health - Liveness plus the catalog being served
pub async fn health(State(state): State<GuidanceAppState>) -> Response {
    let snapshot = state.catalog.current();
    let response = HealthResponse {
        status: "ok",
        catalog_version: snapshot.version.clone(),
        course_count: snapshot.index.len(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Parses the client's session id, or mints one for a new conversation.
fn resolve_session(raw: Option<&str>) -> Result<SessionId, Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(SessionId::new()),
        Some(raw) => raw.parse::<SessionId>().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid session ID")),
            )
                .into_response()
        }),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_guidance_error(error: HandleMessageError, language: Language) -> Response {
    match error {
        HandleMessageError::UpstreamUnavailable {
            source_kind,
            message,
        } => {
            warn!(source = %source_kind, error = %message, "upstream unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::upstream_unavailable(unavailable_message(language))),
            )
                .into_response()
        }
        HandleMessageError::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(msg)),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::UpstreamKind;

    #[test]
    fn upstream_unavailable_maps_to_503() {
        let error = HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::LanguageModel,
            message: "timed out".to_string(),
        };
        let response = handle_guidance_error(error, Language::En);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let error = HandleMessageError::InvalidInput("message must not be empty".to_string());
        let response = handle_guidance_error(error, Language::Ar);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_session_id_mints_a_new_one() {
        assert!(resolve_session(None).is_ok());
        assert!(resolve_session(Some("  ")).is_ok());
    }

    #[test]
    fn malformed_session_id_is_rejected() {
        let response = resolve_session(Some("not-a-uuid")).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
