//! Storage Adapters
//!
//! Implementations of the ConversationStore port for persisting
//! per-session conversation state.
//!
//! ## Available Adapters
//!
//! - **FileConversationStore** - Stores state as YAML files on disk
//! - **InMemoryConversationStore** - Stores state in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileConversationStore, InMemoryConversationStore};
//!
//! // Production: file-based storage
//! let store = FileConversationStore::new("./data/sessions");
//!
//! // Testing: in-memory storage
//! let store = InMemoryConversationStore::new();
//! ```

mod file_conversation_store;
mod in_memory_conversation_store;

pub use file_conversation_store::FileConversationStore;
pub use in_memory_conversation_store::InMemoryConversationStore;
