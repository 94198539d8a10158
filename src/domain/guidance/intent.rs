//! Intent labels and per-turn classification results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Language;

/// The fixed set of things a message can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Search,
    CareerGuidance,
    PlanRequest,
    CourseDetails,
    TitleUnknownSearch,
    CvAnalysis,
    ExplorationChoice,
    OutOfScope,
    Unsafe,
    SupportPolicy,
}

impl Intent {
    pub const ALL: [Intent; 10] = [
        Intent::Search,
        Intent::CareerGuidance,
        Intent::PlanRequest,
        Intent::CourseDetails,
        Intent::TitleUnknownSearch,
        Intent::CvAnalysis,
        Intent::ExplorationChoice,
        Intent::OutOfScope,
        Intent::Unsafe,
        Intent::SupportPolicy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::Search => "SEARCH",
            Intent::CareerGuidance => "CAREER_GUIDANCE",
            Intent::PlanRequest => "PLAN_REQUEST",
            Intent::CourseDetails => "COURSE_DETAILS",
            Intent::TitleUnknownSearch => "TITLE_UNKNOWN_SEARCH",
            Intent::CvAnalysis => "CV_ANALYSIS",
            Intent::ExplorationChoice => "EXPLORATION_CHOICE",
            Intent::OutOfScope => "OUT_OF_SCOPE",
            Intent::Unsafe => "UNSAFE",
            Intent::SupportPolicy => "SUPPORT_POLICY",
        }
    }

    /// Parses a label as a model might write it (`search`, `Course Details`).
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        Intent::ALL.into_iter().find(|i| i.label() == normalized)
    }

    /// Intents the model may return. Exploration choices only come from the
    /// deterministic gate.
    pub fn classifiable() -> Vec<Intent> {
        Intent::ALL
            .into_iter()
            .filter(|i| *i != Intent::ExplorationChoice)
            .collect()
    }

    /// Intents answered from the catalog.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Intent::Search
                | Intent::CareerGuidance
                | Intent::PlanRequest
                | Intent::CourseDetails
                | Intent::TitleUnknownSearch
                | Intent::ExplorationChoice
        )
    }

    /// Intents that name one specific course.
    pub fn is_title_lookup(&self) -> bool {
        matches!(self, Intent::CourseDetails | Intent::TitleUnknownSearch)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Gate,
    Model,
}

/// Classification of one message. Never persisted beyond its turn.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f32,
    pub language: Language,
    pub source: IntentSource,
}

impl IntentResult {
    pub fn gated(intent: Intent, language: Language) -> Self {
        Self {
            intent,
            confidence: 1.0,
            language,
            source: IntentSource::Gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_loosely() {
        assert_eq!(Intent::from_label("SEARCH"), Some(Intent::Search));
        assert_eq!(Intent::from_label(" course details "), Some(Intent::CourseDetails));
        assert_eq!(Intent::from_label("\"plan-request\""), Some(Intent::PlanRequest));
        assert_eq!(Intent::from_label("WEATHER"), None);
    }

    #[test]
    fn serializes_screaming_snake() {
        let json = serde_json::to_string(&Intent::TitleUnknownSearch).unwrap();
        assert_eq!(json, "\"TITLE_UNKNOWN_SEARCH\"");
    }

    #[test]
    fn model_cannot_pick_exploration_choice() {
        assert!(!Intent::classifiable().contains(&Intent::ExplorationChoice));
        assert_eq!(Intent::classifiable().len(), 9);
    }

    #[test]
    fn canned_intents_skip_retrieval() {
        assert!(!Intent::OutOfScope.is_retrieval());
        assert!(!Intent::Unsafe.is_retrieval());
        assert!(!Intent::SupportPolicy.is_retrieval());
        assert!(Intent::Search.is_retrieval());
    }
}
