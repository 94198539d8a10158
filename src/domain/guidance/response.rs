//! The reply handed back to the chat surface.

use serde::{Deserialize, Serialize};

use super::intent::Intent;
use crate::domain::catalog::CourseId;
use crate::domain::foundation::{Language, Percentage, RequestId, SessionId};
use crate::domain::taxonomy::{RoleId, SkillId};

/// One course as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseCard {
    pub id: CourseId,
    pub title: String,
    pub category: String,
    pub level: String,
    pub instructor: String,
    pub duration: String,
    /// Why this course was picked, in the session language.
    pub reason: String,
}

/// A clarifying question with optional quick-reply choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ask {
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl Ask {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }
}

/// How much of the plan the catalog covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Catalog,
    Hybrid,
    Custom,
}

/// A course slice scheduled in a week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub course_id: CourseId,
    pub title: String,
    pub hours: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week: u32,
    pub focus: String,
    #[serde(default)]
    pub items: Vec<PlanItem>,
    pub hours: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub duration_weeks: u32,
    pub hours_per_day: f32,
    pub weekly_hours: f32,
    pub plan_type: PlanType,
    pub coverage: Percentage,
    pub schedule: Vec<WeekPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvScore {
    pub skills: Percentage,
}

/// A role skill with its display name and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: SkillId,
    pub name: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvDashboard {
    pub role: RoleId,
    pub role_name: String,
    pub score: CvScore,
    pub matched: Vec<SkillGap>,
    /// Most important first.
    pub missing: Vec<SkillGap>,
}

/// Everything a turn returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub intent: Intent,
    pub language: Language,
    pub answer: String,
    pub courses: Vec<CourseCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Ask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_plan: Option<LearningPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<CvDashboard>,
    pub session_id: SessionId,
    pub request_id: RequestId,
}

impl StructuredResponse {
    /// A text-only reply.
    pub fn text(
        intent: Intent,
        language: Language,
        answer: impl Into<String>,
        session_id: SessionId,
        request_id: RequestId,
    ) -> Self {
        Self {
            intent,
            language,
            answer: answer.into(),
            courses: Vec::new(),
            ask: None,
            learning_plan: None,
            dashboard: None,
            session_id,
            request_id,
        }
    }

    pub fn with_courses(mut self, courses: Vec<CourseCard>) -> Self {
        self.courses = courses;
        self
    }

    pub fn with_ask(mut self, ask: Ask) -> Self {
        self.ask = Some(ask);
        self
    }

    pub fn with_plan(mut self, plan: LearningPlan) -> Self {
        self.learning_plan = Some(plan);
        self
    }

    pub fn with_dashboard(mut self, dashboard: CvDashboard) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    pub fn course_ids(&self) -> Vec<CourseId> {
        self.courses.iter().map(|c| c.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_sections_are_omitted_from_json() {
        let response = StructuredResponse::text(
            Intent::OutOfScope,
            Language::Ar,
            "...",
            SessionId::new(),
            RequestId::new(),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["intent"], "OUT_OF_SCOPE");
        assert_eq!(json["language"], "ar");
        assert!(json.get("ask").is_none());
        assert!(json.get("learning_plan").is_none());
        assert_eq!(json["courses"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn ask_carries_choices() {
        let ask = Ask::new("Which field?").with_choices(vec!["A".into(), "B".into()]);
        let json = serde_json::to_value(&ask).unwrap();
        assert_eq!(json["choices"][1], "B");
    }
}
