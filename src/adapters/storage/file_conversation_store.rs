//! File-based Conversation Store Adapter
//!
//! Stores each session's conversation state as a YAML file on disk,
//! one file per session id, for easy inspection and debugging.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;
use crate::ports::{ConversationStore, ConversationStoreError};

/// File-based storage for conversation state
#[derive(Debug)]
pub struct FileConversationStore {
    base_path: PathBuf,
    /// Serializes version check and write.
    write_lock: Mutex<()>,
}

impl FileConversationStore {
    /// Create a new file store with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let store = FileConversationStore::new("./data/sessions");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the state file path for a session
    fn state_file_path(&self, session_id: SessionId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", session_id))
    }

    async fn read_state(&self, session_id: SessionId) -> Result<Option<ConversationState>, ConversationStoreError> {
        let file_path = self.state_file_path(session_id);
        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConversationStoreError::IoError(e.to_string())),
        };
        let state = serde_yaml::from_str(&yaml)
            .map_err(|e| ConversationStoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(state))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, session_id: SessionId) -> Result<ConversationState, ConversationStoreError> {
        self.read_state(session_id)
            .await?
            .ok_or(ConversationStoreError::NotFound(session_id))
    }

    async fn save(
        &self,
        state: &ConversationState,
        expected_version: u64,
    ) -> Result<(), ConversationStoreError> {
        let _guard = self.write_lock.lock().await;

        let found = self
            .read_state(state.session_id)
            .await?
            .map(|s| s.version)
            .unwrap_or(0);
        if found != expected_version {
            return Err(ConversationStoreError::VersionConflict {
                session_id: state.session_id,
                expected: expected_version,
                found,
            });
        }

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| ConversationStoreError::IoError(e.to_string()))?;

        let yaml = serde_yaml::to_string(state)
            .map_err(|e| ConversationStoreError::SerializationFailed(e.to_string()))?;

        // Write then rename so readers never see a half-written file.
        let file_path = self.state_file_path(state.session_id);
        let tmp_path = file_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .await
            .map_err(|e| ConversationStoreError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| ConversationStoreError::IoError(e.to_string()))?;

        Ok(())
    }
}
