//! HTTP adapter for guidance endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ChatRequest, CourseDetailResponse, CvRequest, ErrorResponse, HealthResponse, ReloadResponse,
};
pub use handlers::GuidanceAppState;
pub use routes::{admin_routes, guidance_router, guidance_routes};
