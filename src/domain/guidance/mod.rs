//! Guidance domain module.
//!
//! The per-turn stages of the grounding pipeline, leaves first:
//!
//! - `router`: deterministic gates, then model classification
//! - `extractor`: slots (domain, skills, level, time) from free text
//! - `retriever`: hybrid ranking over one catalog snapshot
//! - `guard`: one verdict per candidate, accepted subset kept in order
//! - `consistency`: draft re-checked against the guarded set
//! - `builder`: cards, templates and asks
//!
//! `planner` and `cv` turn guarded courses into a weekly plan and a CV
//! gap dashboard.

mod builder;
mod consistency;
mod cv;
mod drafter;
mod extractor;
mod guard;
mod intent;
mod planner;
mod response;
mod retriever;
mod router;

pub use builder::{unavailable_message, ResponseBuilder};
pub use consistency::{strip_citations, ConsistencyChecker, ConsistencyReport, CITE_CLOSE, CITE_OPEN};
pub use cv::CvScorer;
pub use drafter::{AnswerDrafter, DraftContext, DraftError, DraftSettings};
pub use extractor::{
    parse_duration_weeks, parse_hours_per_day, Extraction, SemanticExtractor, MAX_HOURS_PER_DAY,
    MAX_PLAN_WEEKS,
};
pub use guard::{
    GuardContext, GuardOutcome, GuardPolicy, GuardRecord, RejectReason, RelevanceGuard,
    RelevanceVerdict,
};
pub use intent::{Intent, IntentResult, IntentSource};
pub use planner::{PlanCourse, PlanSettings, StudyPlanner};
pub use response::{
    Ask, CourseCard, CvDashboard, CvScore, LearningPlan, PlanItem, PlanType, SkillGap,
    StructuredResponse, WeekPlan,
};
pub use retriever::{
    Provenance, RetrievalCandidate, RetrievalQuery, RetrievalSettings, Retriever,
    FUZZY_TITLE_THRESHOLD,
};
pub use router::{match_choice, IntentRouter, RouterError, RouterInput, RouterSettings};
