//! HTTP adapters - REST API implementations.
//!
//! - `guidance` - chat turns, CV review, catalog reload and health

pub mod guidance;

pub use guidance::{guidance_router, GuidanceAppState};
