//! Taxonomy file loader.

use std::path::Path;

use crate::domain::taxonomy::SkillTaxonomy;
use crate::ports::CatalogLoadError;

/// Reads and validates the YAML taxonomy at `path`.
pub async fn load_taxonomy_file<P: AsRef<Path>>(path: P) -> Result<SkillTaxonomy, CatalogLoadError> {
    let path = path.as_ref();
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogLoadError::Io(format!("{}: {}", path.display(), e)))?;
    SkillTaxonomy::from_yaml_str(&yaml).map_err(|e| CatalogLoadError::TaxonomyInvalid(e.to_string()))
}
