//! Relevance guard policy

use serde::Deserialize;
use std::collections::BTreeMap;

use super::error::ValidationError;
use crate::domain::guidance::GuardPolicy;
use crate::domain::taxonomy::DomainId;

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Domain id -> catalog categories never shown for it
    #[serde(default)]
    pub disjoint_domains: BTreeMap<String, Vec<String>>,

    /// Drop Beginner courses when Advanced was asked for
    #[serde(default = "default_strict_level_filter")]
    pub strict_level_filter: bool,
}

impl GuardConfig {
    pub fn policy(&self) -> GuardPolicy {
        GuardPolicy {
            disjoint_domains: self
                .disjoint_domains
                .iter()
                .map(|(domain, categories)| (DomainId::new(domain.as_str()), categories.clone()))
                .collect(),
            strict_level_filter: self.strict_level_filter,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some((domain, _)) = self
            .disjoint_domains
            .iter()
            .find(|(_, categories)| categories.iter().any(|c| c.trim().is_empty()))
        {
            return Err(ValidationError::InvalidValue {
                field: "guard.disjoint_domains",
                message: format!("blank category listed for '{}'", domain),
            });
        }
        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            disjoint_domains: BTreeMap::new(),
            strict_level_filter: default_strict_level_filter(),
        }
    }
}

fn default_strict_level_filter() -> bool {
    true
}
