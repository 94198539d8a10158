//! Conversation state persistence

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Exchanges kept per session
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    #[serde(default)]
    pub store: StoreKind,

    /// Directory for the file store
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

/// Where conversation state lives.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

impl ConversationConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_turns == 0 {
            return Err(ValidationError::InvalidValue {
                field: "conversation.history_turns",
                message: "must be at least 1".to_string(),
            });
        }
        if self.store_timeout_secs == 0 || self.store_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout("conversation.store_timeout_secs"));
        }
        if self.store == StoreKind::File && self.store_dir.trim().is_empty() {
            return Err(ValidationError::MissingRequired("conversation.store_dir"));
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            store: StoreKind::default(),
            store_dir: default_store_dir(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

fn default_history_turns() -> usize {
    6
}

fn default_store_dir() -> String {
    "data/sessions".to_string()
}

fn default_store_timeout() -> u64 {
    5
}
