//! Catalog Source Port - Interface for loading the tabular course catalog.

use async_trait::async_trait;

use crate::domain::catalog::CourseRecord;

/// Required columns, in contract order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "category",
    "level",
    "duration",
    "skills",
    "description",
    "instructor",
    "cover",
];

/// A source row that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub reason: String,
}

/// Records read from a source plus what was dropped on the way.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub records: Vec<CourseRecord>,
    /// Content fingerprint of the source.
    pub version: String,
    pub warnings: Vec<RowWarning>,
}

/// Catalog loading failures. Any of these means no catalog is served.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("catalog could not be read: {0}")]
    Io(String),

    #[error("catalog header is missing column '{0}'")]
    MissingColumn(String),

    #[error("catalog is malformed: {0}")]
    Malformed(String),

    #[error("catalog has no valid rows")]
    Empty,

    #[error("taxonomy is invalid: {0}")]
    TaxonomyInvalid(String),
}

/// Port for reading the course catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Read every valid record.
    ///
    /// Rows missing a required value are dropped and reported in
    /// `LoadedCatalog::warnings`; structural problems fail the whole load.
    async fn load(&self) -> Result<LoadedCatalog, CatalogLoadError>;

    /// Where the catalog comes from, for logs.
    fn describe(&self) -> String;
}
