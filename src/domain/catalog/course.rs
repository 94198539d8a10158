//! Catalog course records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::text::fold;
use crate::domain::foundation::{Language, ValidationError};

/// Catalog-assigned course identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Creates a CourseId, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::empty_field("course_id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Course proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    /// Parses a catalog or user level label (English or Arabic).
    pub fn parse(raw: &str) -> Option<Self> {
        match fold(raw).as_str() {
            "beginner" | "beginners" | "basic" | "introductory" | "مبتدي" | "مبتدا"
            | "مبتدئين" | "مبتديين" => Some(CourseLevel::Beginner),
            "intermediate" | "متوسط" => Some(CourseLevel::Intermediate),
            "advanced" | "expert" | "متقدم" => Some(CourseLevel::Advanced),
            _ => None,
        }
    }

    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (CourseLevel::Beginner, Language::En) => "Beginner",
            (CourseLevel::Intermediate, Language::En) => "Intermediate",
            (CourseLevel::Advanced, Language::En) => "Advanced",
            (CourseLevel::Beginner, Language::Ar) => "مبتدئ",
            (CourseLevel::Intermediate, Language::Ar) => "متوسط",
            (CourseLevel::Advanced, Language::Ar) => "متقدم",
        }
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Language::En))
    }
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub title: String,
    pub category: String,
    pub level: CourseLevel,
    /// Total course length in hours, when the catalog states it.
    pub duration_hours: Option<f32>,
    /// Free-text skill labels as written in the catalog.
    pub skills: Vec<String>,
    pub description: String,
    pub instructor: String,
    pub cover: String,
    pub published: Option<NaiveDate>,
}

impl CourseRecord {
    /// Human readable duration ("12h", "1.5h"), empty when unknown.
    pub fn duration_label(&self) -> String {
        match self.duration_hours {
            Some(h) if h.fract() == 0.0 => format!("{}h", h as u32),
            Some(h) => format!("{:.1}h", h),
            None => String::new(),
        }
    }
}
