//! Application configuration module
//!
//! Configuration is layered: `.env` (via `dotenvy`), then an optional
//! `career_copilot.toml`, then environment variables with the
//! `CAREER_COPILOT` prefix, where `__` separates nested values.
//!
//! # Example
//!
//! ```no_run
//! use career_copilot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod catalog;
mod conversation;
mod error;
mod guard;
mod plan;
mod retrieval;
mod server;

pub use ai::{AiConfig, AiProvider};
pub use catalog::CatalogConfig;
pub use conversation::{ConversationConfig, StoreKind};
pub use error::{ConfigError, ValidationError};
pub use guard::GuardConfig;
pub use plan::PlanConfig;
pub use retrieval::RetrievalConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

use crate::application::handlers::guidance::GuidanceSettings;
use crate::domain::guidance::{DraftSettings, RouterSettings};

/// Optional policy file, looked up relative to the working directory.
const CONFIG_FILE: &str = "career_copilot";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model provider
    #[serde(default)]
    pub ai: AiConfig,

    /// Catalog and taxonomy files
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Relevance guard policy table
    #[serde(default)]
    pub guard: GuardConfig,

    /// Conversation state persistence
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Study plan scheduling
    #[serde(default)]
    pub plan: PlanConfig,
}

impl AppConfig {
    /// Load configuration from `career_copilot.toml` and the environment
    ///
    /// # Environment Variable Format
    ///
    /// - `CAREER_COPILOT__SERVER__PORT=9000` -> `server.port = 9000`
    /// - `CAREER_COPILOT__AI__API_KEY=...` -> `ai.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::default()
                    .prefix("CAREER_COPILOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.catalog.validate()?;
        self.retrieval.validate()?;
        self.guard.validate()?;
        self.conversation.validate()?;
        self.plan.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Pipeline tunables assembled from every section.
    pub fn guidance_settings(&self) -> GuidanceSettings {
        GuidanceSettings {
            router: RouterSettings {
                timeout: self.ai.timeout(),
                temperature: self.ai.classification_temperature,
                history_turns: self.conversation.history_turns,
            },
            draft: DraftSettings {
                timeout: self.ai.timeout(),
                temperature: self.ai.draft_temperature,
                max_tokens: self.ai.draft_max_tokens,
            },
            retrieval: self.retrieval.settings(),
            guard: self.guard.policy(),
            plan: self.plan.settings(),
            history_turns: self.conversation.history_turns,
            store_timeout: self.conversation.store_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CAREER_COPILOT__AI__API_KEY", "gsk-test");
    }

    fn clear_env() {
        env::remove_var("CAREER_COPILOT__AI__API_KEY");
        env::remove_var("CAREER_COPILOT__AI__PROVIDER");
        env::remove_var("CAREER_COPILOT__SERVER__PORT");
        env::remove_var("CAREER_COPILOT__SERVER__ENVIRONMENT");
        env::remove_var("CAREER_COPILOT__RETRIEVAL__SEARCH_CAP");
        env::remove_var("CAREER_COPILOT__CONVERSATION__STORE");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.ai.api_key(), Some("gsk-test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        assert_eq!(
            AppConfig::default().validate(),
            Err(ValidationError::MissingRequired("ai.api_key"))
        );
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CAREER_COPILOT__SERVER__PORT", "9000");
        env::set_var("CAREER_COPILOT__AI__PROVIDER", "openai");
        env::set_var("CAREER_COPILOT__RETRIEVAL__SEARCH_CAP", "4");
        env::set_var("CAREER_COPILOT__CONVERSATION__STORE", "file");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.ai.provider, AiProvider::OpenAI);
        assert_eq!(config.retrieval.search_cap, 4);
        assert_eq!(config.conversation.store, StoreKind::File);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CAREER_COPILOT__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_guidance_settings_follow_sections() {
        let mut config = AppConfig::default();
        config.ai.timeout_secs = 7;
        config.ai.draft_max_tokens = 300;
        config.conversation.history_turns = 3;
        config.retrieval.search_cap = 5;

        let settings = config.guidance_settings();
        assert_eq!(settings.router.timeout, Duration::from_secs(7));
        assert_eq!(settings.router.history_turns, 3);
        assert_eq!(settings.draft.max_tokens, 300);
        assert_eq!(settings.retrieval.search_cap, 5);
        assert_eq!(settings.history_turns, 3);
    }
}
