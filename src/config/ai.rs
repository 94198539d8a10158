//! Language model provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Language model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Which OpenAI-compatible endpoint to call
    #[serde(default = "default_provider")]
    pub provider: AiProvider,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Overrides the provider's default base URL
    pub base_url: Option<String>,

    /// Overrides the provider's default model
    pub model: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries on retryable provider errors
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    #[serde(default = "default_classification_temperature")]
    pub classification_temperature: f32,

    #[serde(default = "default_draft_temperature")]
    pub draft_temperature: f32,

    #[serde(default = "default_draft_max_tokens")]
    pub draft_max_tokens: u32,
}

/// AI provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Groq,
    OpenAI,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured key, when non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key().is_none() {
            return Err(ValidationError::MissingRequired("ai.api_key"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout("ai.timeout_secs"));
        }
        for (field, value) in [
            ("ai.classification_temperature", self.classification_temperature),
            ("ai.draft_temperature", self.draft_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ValidationError::InvalidValue {
                    field,
                    message: format!("{} is outside 0..=2", value),
                });
            }
        }
        if self.draft_max_tokens == 0 {
            return Err(ValidationError::InvalidValue {
                field: "ai.draft_max_tokens",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            classification_temperature: default_classification_temperature(),
            draft_temperature: default_draft_temperature(),
            draft_max_tokens: default_draft_max_tokens(),
        }
    }
}

fn default_provider() -> AiProvider {
    AiProvider::Groq
}

fn default_timeout() -> u64 {
    20
}

fn default_retries() -> u32 {
    2
}

fn default_classification_temperature() -> f32 {
    0.0
}

fn default_draft_temperature() -> f32 {
    0.3
}

fn default_draft_max_tokens() -> u32 {
    700
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> AiConfig {
        AiConfig {
            api_key: Some("gsk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.provider, AiProvider::Groq);
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.draft_max_tokens, 700);
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        assert_eq!(
            AiConfig::default().validate(),
            Err(ValidationError::MissingRequired("ai.api_key"))
        );

        let blank = AiConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_temperature_fails() {
        let config = AiConfig {
            draft_temperature: 3.5,
            ..with_key()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidValue { field: "ai.draft_temperature", .. })
        ));
    }

    #[test]
    fn test_provider_deserializes_lowercase() {
        let provider: AiProvider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(provider, AiProvider::OpenAI);
    }
}
