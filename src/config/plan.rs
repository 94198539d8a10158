//! Study plan scheduling

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::guidance::PlanSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_study_days_per_week")]
    pub study_days_per_week: u32,

    /// Hours assumed for a course with no duration
    #[serde(default = "default_course_hours")]
    pub default_course_hours: f32,
}

impl PlanConfig {
    pub fn settings(&self) -> PlanSettings {
        PlanSettings {
            study_days_per_week: self.study_days_per_week,
            default_course_hours: self.default_course_hours,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=7).contains(&self.study_days_per_week) {
            return Err(ValidationError::InvalidValue {
                field: "plan.study_days_per_week",
                message: format!("{} is outside 1..=7", self.study_days_per_week),
            });
        }
        if !self.default_course_hours.is_finite() || self.default_course_hours <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "plan.default_course_hours",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            study_days_per_week: default_study_days_per_week(),
            default_course_hours: default_course_hours(),
        }
    }
}

fn default_study_days_per_week() -> u32 {
    5
}

fn default_course_hours() -> f32 {
    5.0
}
