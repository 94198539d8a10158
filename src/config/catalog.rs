//! Catalog and taxonomy file locations

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Course catalog CSV
    #[serde(default = "default_path")]
    pub path: String,

    /// Skill taxonomy YAML
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: String,
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("catalog.path"));
        }
        if self.taxonomy_path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("catalog.taxonomy_path"));
        }
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            taxonomy_path: default_taxonomy_path(),
        }
    }
}

fn default_path() -> String {
    "data/courses.csv".to_string()
}

fn default_taxonomy_path() -> String {
    "data/taxonomy.yaml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_shipped_data() {
        let config = CatalogConfig::default();
        assert_eq!(config.path, "data/courses.csv");
        assert_eq!(config.taxonomy_path, "data/taxonomy.yaml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_path_fails() {
        let config = CatalogConfig {
            path: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MissingRequired("catalog.path")));
    }
}
