//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - OpenAI-compatible language model provider and a scripted mock
//! - `catalog` - CSV course catalog and YAML taxonomy loaders
//! - `storage` - in-memory and file-backed conversation stores
//! - `http` - axum routes

pub mod ai;
pub mod catalog;
pub mod http;
pub mod storage;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use catalog::{load_taxonomy_file, CsvCatalogSource};
pub use http::{guidance_router, GuidanceAppState};
pub use storage::{FileConversationStore, InMemoryConversationStore};
