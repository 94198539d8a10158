//! In-Memory Conversation Store Adapter
//!
//! Stores conversation state in memory.
//! Used for tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;
use crate::ports::{ConversationStore, ConversationStoreError};

/// In-memory storage for conversation state
#[derive(Debug, Clone)]
pub struct InMemoryConversationStore {
    states: Arc<RwLock<HashMap<SessionId, ConversationState>>>,
}

impl InMemoryConversationStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.states.write().await.clear();
    }

    /// Get the number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.states.read().await.len()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, session_id: SessionId) -> Result<ConversationState, ConversationStoreError> {
        let states = self.states.read().await;
        states
            .get(&session_id)
            .cloned()
            .ok_or(ConversationStoreError::NotFound(session_id))
    }

    async fn save(
        &self,
        state: &ConversationState,
        expected_version: u64,
    ) -> Result<(), ConversationStoreError> {
        // Check and write under one lock so two turns cannot both pass.
        let mut states = self.states.write().await;
        let found = states.get(&state.session_id).map(|s| s.version).unwrap_or(0);
        if found != expected_version {
            return Err(ConversationStoreError::VersionConflict {
                session_id: state.session_id,
                expected: expected_version,
                found,
            });
        }
        states.insert(state.session_id, state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(session_id: SessionId) -> ConversationState {
        let mut state = ConversationState::new(session_id);
        state.finish_turn("hi", "hello", 6);
        state
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryConversationStore::new();
        let state = committed(SessionId::new());

        store.save(&state, 0).await.unwrap();
        let loaded = store.load(state.session_id).await.unwrap();

        assert_eq!(loaded, state);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_load_not_found() {
        let store = InMemoryConversationStore::new();
        let result = store.load(SessionId::new()).await;
        assert!(matches!(result, Err(ConversationStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_write_is_refused() {
        let store = InMemoryConversationStore::new();
        let session_id = SessionId::new();
        let first = committed(session_id);
        store.save(&first, 0).await.unwrap();

        // A second turn that also started from version 0 loses.
        let racing = committed(session_id);
        let result = store.save(&racing, 0).await;
        assert!(matches!(
            result,
            Err(ConversationStoreError::VersionConflict { expected: 0, found: 1, .. })
        ));

        let mut next = first.clone();
        next.finish_turn("again", "ok", 6);
        store.save(&next, 1).await.unwrap();
        assert_eq!(store.load(session_id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryConversationStore::new();
        store.save(&committed(SessionId::new()), 0).await.unwrap();
        store.clear().await;
        assert_eq!(store.session_count().await, 0);
    }
}
