//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - the language model used for intent classification and
//!   answer drafting
//! - `ConversationStore` - versioned per-session state persistence
//! - `CatalogSource` - the tabular course catalog

mod ai_provider;
mod catalog_source;
mod conversation_store;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, RequestPurpose, TokenUsage,
};
pub use catalog_source::{
    CatalogLoadError, CatalogSource, LoadedCatalog, RowWarning, REQUIRED_COLUMNS,
};
pub use conversation_store::{ConversationStore, ConversationStoreError};
