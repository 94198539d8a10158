//! Catalog Adapters
//!
//! - **CsvCatalogSource** - Reads the course catalog from a CSV file
//! - **load_taxonomy_file** - Reads the skill taxonomy from YAML

mod csv_catalog;
mod taxonomy_file;

pub use csv_catalog::{parse_catalog, CsvCatalogSource};
pub use taxonomy_file::load_taxonomy_file;
