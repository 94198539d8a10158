//! Guidance command handlers.
//!
//! One chat turn, one CV review and one catalog reload each have a handler;
//! the first two share a [`GuidancePipeline`].

mod handle_cv;
mod handle_message;
mod pipeline;
mod reload_catalog;

pub use handle_cv::{HandleCvCommand, HandleCvHandler, HandleCvResult};
pub use handle_message::{
    HandleMessageCommand, HandleMessageError, HandleMessageHandler, HandleMessageResult,
    UpstreamKind,
};
pub use pipeline::{GuidancePipeline, GuidanceSettings, TurnIds};
pub use reload_catalog::{
    load_snapshot, short_version, ReloadCatalogError, ReloadCatalogHandler, ReloadCatalogResult,
};
