//! Catalog - the authoritative course set the pipeline may recommend from.
//!
//! Records are immutable once loaded. A reload builds a fresh
//! [`CatalogSnapshot`] and swaps it into the [`CatalogHandle`].

mod course;
mod embedding;
mod index;
mod snapshot;

pub use course::{CourseId, CourseLevel, CourseRecord};
pub use embedding::{cosine_similarity, Embedder, Embedding};
pub use index::{CatalogIndex, VectorLookupError};
pub use snapshot::{CatalogHandle, CatalogSnapshot};
