//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::guidance::{GuidancePipeline, GuidanceSettings};
pub use handlers::{
    HandleCvCommand, HandleCvHandler, HandleCvResult, HandleMessageCommand, HandleMessageError,
    HandleMessageHandler, HandleMessageResult, ReloadCatalogError, ReloadCatalogHandler,
    ReloadCatalogResult, UpstreamKind,
};
