//! Conversation Store Port - Interface for persisting conversation state.
//!
//! The pipeline loads a session's state at the start of a turn and saves it
//! once the response is built. Saves are versioned: the caller passes the
//! version it loaded, and a store that already holds a newer version refuses
//! the write instead of silently dropping slot updates.

use async_trait::async_trait;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;

/// Errors that can occur during conversation store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversationStoreError {
    #[error("State not found for session: {0}")]
    NotFound(SessionId),

    #[error("Version conflict for session {session_id}: expected {expected}, found {found}")]
    VersionConflict {
        session_id: SessionId,
        expected: u64,
        found: u64,
    },

    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize state: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for loading and saving per-session conversation state
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the state of a session
    ///
    /// # Errors
    /// Returns `ConversationStoreError::NotFound` if the session has no state yet
    async fn load(&self, session_id: SessionId) -> Result<ConversationState, ConversationStoreError>;

    /// Save state written on top of `expected_version`
    ///
    /// `expected_version` is the version the turn loaded (0 for a new
    /// session). `state.version` is the version being written.
    ///
    /// # Errors
    /// Returns `ConversationStoreError::VersionConflict` if the stored
    /// version differs from `expected_version`
    async fn save(
        &self,
        state: &ConversationState,
        expected_version: u64,
    ) -> Result<(), ConversationStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_session() {
        let id = SessionId::new();
        let err = ConversationStoreError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn version_conflict_shows_both_versions() {
        let err = ConversationStoreError::VersionConflict {
            session_id: SessionId::new(),
            expected: 3,
            found: 4,
        };
        let message = err.to_string();
        assert!(message.contains("expected 3"));
        assert!(message.contains("found 4"));
    }

    #[test]
    fn serialization_error_mentions_serialize() {
        let err = ConversationStoreError::SerializationFailed("Invalid YAML".to_string());
        assert!(err.to_string().contains("serialize"));
    }
}
