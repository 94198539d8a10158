//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod guidance;

pub use guidance::{
    HandleCvCommand, HandleCvHandler, HandleCvResult, HandleMessageCommand, HandleMessageError,
    HandleMessageHandler, HandleMessageResult, ReloadCatalogError, ReloadCatalogHandler,
    ReloadCatalogResult, UpstreamKind,
};
