//! Retrieval tunables

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::guidance::RetrievalSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Result cap for SEARCH
    #[serde(default = "default_search_cap")]
    pub search_cap: usize,

    /// Result cap for CAREER_GUIDANCE and PLAN_REQUEST
    #[serde(default = "default_guidance_cap")]
    pub guidance_cap: usize,

    /// Skill-exact hits below this trigger the vector fallback
    #[serde(default = "default_min_skill_matches")]
    pub min_skill_matches: usize,

    #[serde(default = "default_min_vector_similarity")]
    pub min_vector_similarity: f32,

    /// Hashed embedding width
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
}

impl RetrievalConfig {
    pub fn settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            search_cap: self.search_cap,
            guidance_cap: self.guidance_cap,
            min_skill_matches: self.min_skill_matches,
            min_vector_similarity: self.min_vector_similarity,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.search_cap == 0 {
            return Err(ValidationError::InvalidCap("retrieval.search_cap"));
        }
        if self.guidance_cap == 0 {
            return Err(ValidationError::InvalidCap("retrieval.guidance_cap"));
        }
        if !(0.0..=1.0).contains(&self.min_vector_similarity) {
            return Err(ValidationError::InvalidThreshold("retrieval.min_vector_similarity"));
        }
        if self.embedding_dims < 16 {
            return Err(ValidationError::InvalidValue {
                field: "retrieval.embedding_dims",
                message: format!("{} is below 16", self.embedding_dims),
            });
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_cap: default_search_cap(),
            guidance_cap: default_guidance_cap(),
            min_skill_matches: default_min_skill_matches(),
            min_vector_similarity: default_min_vector_similarity(),
            embedding_dims: default_embedding_dims(),
        }
    }
}

fn default_search_cap() -> usize {
    10
}

fn default_guidance_cap() -> usize {
    8
}

fn default_min_skill_matches() -> usize {
    3
}

fn default_min_vector_similarity() -> f32 {
    0.2
}

fn default_embedding_dims() -> usize {
    256
}
