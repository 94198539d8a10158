//! CSV Catalog Source Adapter
//!
//! Reads the course catalog from a CSV file with a header row. Rows that are
//! short of a required column or miss a required value are dropped with a
//! warning; a missing header column fails the whole load. The catalog version is the SHA-256 of the
//! file bytes.

use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::catalog::{CourseId, CourseLevel, CourseRecord};
use crate::ports::{CatalogLoadError, CatalogSource, LoadedCatalog, RowWarning, REQUIRED_COLUMNS};

/// Optional column feeding recency ranking.
const PUBLISHED_COLUMN: &str = "published";

/// Catalog source backed by a CSV file.
#[derive(Debug, Clone)]
pub struct CsvCatalogSource {
    path: PathBuf,
}

impl CsvCatalogSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CatalogSource for CsvCatalogSource {
    async fn load(&self) -> Result<LoadedCatalog, CatalogLoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CatalogLoadError::Io(format!("{}: {}", self.path.display(), e)))?;
        let loaded = parse_catalog(&bytes)?;
        for warning in &loaded.warnings {
            warn!(row = warning.row, reason = %warning.reason, "dropped catalog row");
        }
        Ok(loaded)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Parses catalog CSV bytes.
pub fn parse_catalog(bytes: &[u8]) -> Result<LoadedCatalog, CatalogLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| CatalogLoadError::Malformed(e.to_string()))?
        .clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim_start_matches('\u{feff}').to_lowercase(), i))
        .collect();
    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(CatalogLoadError::MissingColumn(required.to_string()));
        }
    }

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut seen: HashSet<CourseId> = HashSet::new();

    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = row.map_err(|e| CatalogLoadError::Malformed(format!("row {}: {}", row_number, e)))?;

        match parse_row(&row, &columns) {
            Ok(record) => {
                if !seen.insert(record.id.clone()) {
                    warnings.push(RowWarning {
                        row: row_number,
                        reason: format!("duplicate id '{}'", record.id),
                    });
                    continue;
                }
                records.push(record);
            }
            Err(reason) => warnings.push(RowWarning {
                row: row_number,
                reason,
            }),
        }
    }

    if records.is_empty() {
        return Err(CatalogLoadError::Empty);
    }

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Ok(LoadedCatalog {
        records,
        version: format!("{:x}", hasher.finalize()),
        warnings,
    })
}

fn cell<'r>(row: &'r csv::StringRecord, columns: &HashMap<String, usize>, name: &str) -> &'r str {
    columns.get(name).and_then(|i| row.get(*i)).unwrap_or("")
}

fn parse_row(row: &csv::StringRecord, columns: &HashMap<String, usize>) -> Result<CourseRecord, String> {
    // Flexible parsing accepts short rows; a truncated row is not a course.
    for required in REQUIRED_COLUMNS {
        if columns.get(required).map_or(true, |i| *i >= row.len()) {
            return Err(format!("truncated row: no {} column", required));
        }
    }

    let field = |name: &str| cell(row, columns, name);
    for required in ["id", "title", "category", "level"] {
        if field(required).is_empty() {
            return Err(format!("missing {}", required));
        }
    }
    let id = CourseId::new(field("id")).map_err(|e| e.to_string())?;
    let level = CourseLevel::parse(field("level"))
        .ok_or_else(|| format!("unknown level '{}'", field("level")))?;

    Ok(CourseRecord {
        id,
        title: field("title").to_string(),
        category: field("category").to_string(),
        level,
        duration_hours: parse_duration(field("duration")),
        skills: split_skills(field("skills")),
        description: field("description").to_string(),
        instructor: field("instructor").to_string(),
        cover: field("cover").to_string(),
        published: NaiveDate::parse_from_str(field(PUBLISHED_COLUMN), "%Y-%m-%d").ok(),
    })
}

/// Hours from "12", "12.5", "12 hours", "12h".
fn parse_duration(raw: &str) -> Option<f32> {
    let number: String = raw
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse::<f32>().ok().filter(|h| *h > 0.0)
}

fn split_skills(raw: &str) -> Vec<String> {
    raw.split(|c: char| matches!(c, ',' | ';' | '|'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
