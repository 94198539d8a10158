//! HTTP DTOs for guidance endpoints.
//!
//! Successful turns return the domain `StructuredResponse` as-is; these
//! types cover requests, the admin and health payloads, and errors.

use serde::{Deserialize, Serialize};

use crate::application::handlers::ReloadCatalogResult;
use crate::domain::catalog::{CourseLevel, CourseRecord};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request carrying one chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Absent on the first message of a conversation.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// Request carrying extracted CV text.
#[derive(Debug, Clone, Deserialize)]
pub struct CvRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub cv_text: String,
    #[serde(default)]
    pub target_role: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct ReloadResponse {
    pub version: String,
    pub previous_version: String,
    pub course_count: usize,
    pub dropped_rows: usize,
}

impl From<ReloadCatalogResult> for ReloadResponse {
    fn from(result: ReloadCatalogResult) -> Self {
        Self {
            version: result.version,
            previous_version: result.previous_version,
            course_count: result.course_count,
            dropped_rows: result.dropped_rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog_version: String,
    pub course_count: usize,
}

/// Full catalog entry for one course.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetailResponse {
    pub course_id: String,
    pub title: String,
    pub category: String,
    pub level: CourseLevel,
    pub instructor: String,
    pub duration_hours: Option<f32>,
    pub skills: Vec<String>,
    pub description: String,
    pub cover: String,
}

impl From<&CourseRecord> for CourseDetailResponse {
    fn from(course: &CourseRecord) -> Self {
        Self {
            course_id: course.id.to_string(),
            title: course.title.clone(),
            category: course.category.clone(),
            level: course.level,
            instructor: course.instructor.clone(),
            duration_hours: course.duration_hours,
            skills: course.skills.clone(),
            description: course.description.clone(),
            cover: course.cover.clone(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self {
            code: "UPSTREAM_UNAVAILABLE".to_string(),
            message: message.into(),
            retryable: true,
        }
    }

    pub fn course_not_found(course_id: &str) -> Self {
        Self {
            code: "COURSE_NOT_FOUND".to_string(),
            message: format!("Course not found: {}", course_id),
            retryable: false,
        }
    }

    pub fn catalog_load_failed(message: impl Into<String>) -> Self {
        Self {
            code: "CATALOG_LOAD_FAILED".to_string(),
            message: message.into(),
            retryable: false,
        }
    }
}
