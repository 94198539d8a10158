//! ReloadCatalogHandler - rebuilds the catalog index and swaps it in.
//!
//! The new snapshot is built entirely off to the side. Only a successful
//! build replaces the live one; a failed load leaves it serving.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::catalog::{CatalogHandle, CatalogIndex, CatalogSnapshot, Embedder};
use crate::domain::taxonomy::SkillTaxonomy;
use crate::ports::{CatalogLoadError, CatalogSource};

/// Result of a successful reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadCatalogResult {
    pub version: String,
    pub previous_version: String,
    pub course_count: usize,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Error)]
pub enum ReloadCatalogError {
    #[error("catalog reload failed: {0}")]
    Load(#[from] CatalogLoadError),
}

/// Loads the source and builds a snapshot. Used at startup and on reload.
pub async fn load_snapshot(
    source: &dyn CatalogSource,
    taxonomy: &SkillTaxonomy,
    embedding_dims: usize,
) -> Result<CatalogSnapshot, CatalogLoadError> {
    let loaded = source.load().await?;
    let dropped_rows = loaded.warnings.len();
    let index = CatalogIndex::build(loaded.records, taxonomy, Embedder::new(embedding_dims));
    Ok(CatalogSnapshot::new(index, loaded.version, dropped_rows))
}

pub struct ReloadCatalogHandler {
    source: Arc<dyn CatalogSource>,
    taxonomy: Arc<SkillTaxonomy>,
    catalog: Arc<CatalogHandle>,
    embedding_dims: usize,
}

impl ReloadCatalogHandler {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        taxonomy: Arc<SkillTaxonomy>,
        catalog: Arc<CatalogHandle>,
        embedding_dims: usize,
    ) -> Self {
        Self {
            source,
            taxonomy,
            catalog,
            embedding_dims,
        }
    }

    pub async fn handle(&self) -> Result<ReloadCatalogResult, ReloadCatalogError> {
        let snapshot = load_snapshot(self.source.as_ref(), &self.taxonomy, self.embedding_dims)
            .await
            .map_err(|err| {
                warn!(source = %self.source.describe(), error = %err, "catalog reload failed, keeping current snapshot");
                err
            })?;

        let version = snapshot.version.clone();
        let course_count = snapshot.index.len();
        let dropped_rows = snapshot.dropped_rows;
        let previous = self.catalog.swap(snapshot);

        info!(
            source = %self.source.describe(),
            version = %short_version(&version),
            previous = %short_version(&previous.version),
            course_count,
            dropped_rows,
            "catalog reloaded"
        );

        Ok(ReloadCatalogResult {
            version,
            previous_version: previous.version.clone(),
            course_count,
            dropped_rows,
        })
    }
}

/// First 12 hex characters, for logs.
pub fn short_version(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}
