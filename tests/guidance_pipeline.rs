//! End-to-end turns through the guidance handlers.
//!
//! Uses the shipped taxonomy, sample catalog and policy file, a scripted
//! language model and the in-memory conversation store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use career_copilot::adapters::ai::{MockAIProvider, MockError};
use career_copilot::adapters::catalog::parse_catalog;
use career_copilot::adapters::storage::InMemoryConversationStore;
use career_copilot::application::handlers::guidance::{
    GuidancePipeline, HandleCvCommand, HandleCvHandler, HandleMessageCommand, HandleMessageError,
    HandleMessageHandler, HandleMessageResult, UpstreamKind,
};
use career_copilot::config::AppConfig;
use career_copilot::domain::catalog::{CatalogHandle, CatalogIndex, CatalogSnapshot, Embedder};
use career_copilot::domain::conversation::ConversationState;
use career_copilot::domain::foundation::{Language, SessionId};
use career_copilot::domain::guidance::Intent;
use career_copilot::domain::taxonomy::{DomainId, RoleId, SkillId, SkillTaxonomy};
use career_copilot::ports::{ConversationStore, ConversationStoreError, RequestPurpose};

const TAXONOMY: &str = include_str!("../data/taxonomy.yaml");
const COURSES: &str = include_str!("../data/courses.csv");
const POLICY: &str = include_str!("../career_copilot.toml");

// ════════════════════════════════════════════════════════════════════════════
// Fixture
// ════════════════════════════════════════════════════════════════════════════

struct Fixture {
    messages: HandleMessageHandler,
    cvs: HandleCvHandler,
    ai: MockAIProvider,
    taxonomy: Arc<SkillTaxonomy>,
    config: AppConfig,
    /// Course id -> catalog category.
    categories: HashMap<String, String>,
}

impl Fixture {
    fn new(ai: MockAIProvider) -> Self {
        Self::with_store(ai, Arc::new(InMemoryConversationStore::new()))
    }

    fn with_store(ai: MockAIProvider, store: Arc<dyn ConversationStore>) -> Self {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(POLICY, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let taxonomy = Arc::new(SkillTaxonomy::from_yaml_str(TAXONOMY).unwrap());
        let loaded = parse_catalog(COURSES.as_bytes()).unwrap();
        let categories = loaded
            .records
            .iter()
            .map(|r| (r.id.to_string(), r.category.clone()))
            .collect();
        let index = CatalogIndex::build(
            loaded.records,
            &taxonomy,
            Embedder::new(config.retrieval.embedding_dims),
        );
        let catalog = Arc::new(CatalogHandle::new(CatalogSnapshot::new(index, loaded.version, 0)));

        let pipeline = Arc::new(GuidancePipeline::new(
            Arc::new(ai.clone()),
            store,
            taxonomy.clone(),
            catalog,
            config.guidance_settings(),
        ));

        Self {
            messages: HandleMessageHandler::new(pipeline.clone()),
            cvs: HandleCvHandler::new(pipeline),
            ai,
            taxonomy,
            config,
            categories,
        }
    }

    async fn say(&self, session_id: SessionId, message: &str) -> HandleMessageResult {
        self.messages
            .handle(HandleMessageCommand::new(session_id, message))
            .await
            .unwrap()
    }

    fn category(&self, course_id: &str) -> &str {
        self.categories.get(course_id).map(String::as_str).unwrap_or("")
    }

    fn disjoint_for(&self, domain: &str) -> Vec<String> {
        self.config
            .guard
            .disjoint_domains
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }
}

/// Every shown course has an accept verdict from the same turn.
fn assert_grounded(result: &HandleMessageResult) {
    for card in &result.response.courses {
        let accepted = result
            .verdicts
            .iter()
            .any(|record| record.course_id == card.id && record.verdict.is_accept());
        assert!(accepted, "course {} shown without an accept verdict", card.id);
    }
}

/// The deterministic answer over the shown cards of a search turn.
fn template_for(result: &HandleMessageResult) -> String {
    let mut text = "Here are courses from the catalog that fit:".to_string();
    for (rank, card) in result.response.courses.iter().enumerate() {
        text.push_str(&format!("\n{}. {} ({})", rank + 1, card.title, card.level));
    }
    text
}

// ════════════════════════════════════════════════════════════════════════════
// Scenarios
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn movie_request_is_out_of_scope_without_retrieval() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("OUT_OF_SCOPE"));

    let result = fx.say(SessionId::new(), "اقترحلي فيلم").await;

    assert_eq!(result.response.intent, Intent::OutOfScope);
    assert_eq!(result.response.language, Language::Ar);
    assert!(result.response.courses.is_empty());
    assert!(result.verdicts.is_empty());
    assert!(!result.response.answer.is_empty());
    assert_eq!(fx.ai.calls_for(RequestPurpose::Classification), 1);
    assert_eq!(fx.ai.calls_for(RequestPurpose::Drafting), 0);
}

#[tokio::test]
async fn exact_title_returns_that_course_only() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("SEARCH"));

    let result = fx.say(SessionId::new(), "SQL for Data Analysis").await;

    assert_eq!(result.response.intent, Intent::CourseDetails);
    assert_eq!(result.response.courses.len(), 1);
    assert_eq!(result.response.courses[0].title, "SQL for Data Analysis");
    assert_grounded(&result);
}

#[tokio::test]
async fn plan_without_topic_asks_for_domain() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("PLAN_REQUEST"));

    let result = fx.say(SessionId::new(), "Make me a study plan: 8 weeks, 2/day").await;

    assert_eq!(result.response.intent, Intent::PlanRequest);
    assert!(result.response.ask.is_some());
    assert!(result.response.learning_plan.is_none());
    assert!(result.response.courses.is_empty());
}

#[tokio::test]
async fn cv_with_six_of_ten_skills_scores_sixty() {
    let fx = Fixture::new(MockAIProvider::new());

    let result = fx
        .cvs
        .handle(HandleCvCommand {
            session_id: SessionId::new(),
            cv_text: "Skills: Excel, SQL, Power BI, Tableau, Statistics, Python".to_string(),
            target_role: Some("data analyst".to_string()),
        })
        .await
        .unwrap();

    let dashboard = result.response.dashboard.as_ref().unwrap();
    assert_eq!(dashboard.role.as_str(), "data_analyst");
    assert_eq!(dashboard.score.skills.value(), 60);

    let mut missing: Vec<&str> = dashboard.missing.iter().map(|g| g.skill.as_str()).collect();
    missing.sort_unstable();
    assert_eq!(missing, vec!["communication", "data_cleaning", "data_visualization", "pandas"]);

    // Gap courses went through the guard like any other turn.
    for card in &result.response.courses {
        assert!(result
            .verdicts
            .iter()
            .any(|r| r.course_id == card.id && r.verdict.is_accept()));
    }
    assert_eq!(fx.ai.call_count(), 0);
}

#[tokio::test]
async fn cv_request_without_text_asks_for_paste() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("CV_ANALYSIS"));

    let result = fx.say(SessionId::new(), "Can you review my resume?").await;

    assert_eq!(result.response.intent, Intent::CvAnalysis);
    assert!(result.response.ask.is_some());
    assert!(result.response.dashboard.is_none());
}

#[tokio::test]
async fn unsafe_request_is_gated_before_the_model() {
    let fx = Fixture::new(MockAIProvider::new());

    let result = fx.say(SessionId::new(), "how to hack my friend's instagram account").await;

    assert_eq!(result.response.intent, Intent::Unsafe);
    assert!(result.response.courses.is_empty());
    assert_eq!(fx.ai.call_count(), 0);
}

#[tokio::test]
async fn ethical_hacking_is_a_normal_search() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("SEARCH"));

    let result = fx.say(SessionId::new(), "ethical hacking courses").await;

    assert_eq!(result.response.intent, Intent::Search);
    assert!(result
        .response
        .courses
        .iter()
        .any(|c| c.title == "Ethical Hacking Essentials"));
    assert_grounded(&result);
}

#[tokio::test]
async fn pricing_question_is_support_policy() {
    let fx = Fixture::new(MockAIProvider::new());

    let result = fx.say(SessionId::new(), "How much is the subscription?").await;

    assert_eq!(result.response.intent, Intent::SupportPolicy);
    assert_eq!(fx.ai.call_count(), 0);
}

// ════════════════════════════════════════════════════════════════════════════
// Properties
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn shown_courses_always_passed_the_guard() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Start with SQL for Data Analysis, then Excel for Beginners.")
            .with_intent("SEARCH"),
    );
    let session = SessionId::new();

    let first = fx.say(session, "I want to learn SQL and Excel").await;
    assert!(!first.response.courses.is_empty());
    assert_grounded(&first);

    let second = fx.say(session, "show me more").await;
    assert_grounded(&second);
    // "more" never repeats what was just shown.
    for card in &second.response.courses {
        assert!(!first.response.course_ids().contains(&card.id));
    }
}

#[tokio::test]
async fn retrieval_is_deterministic_across_sessions() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Here are some options.")
            .with_intent("SEARCH")
            .with_response("Here are some options."),
    );

    let first = fx.say(SessionId::new(), "python and pandas for data cleaning").await;
    let second = fx.say(SessionId::new(), "python and pandas for data cleaning").await;

    assert!(!first.response.courses.is_empty());
    assert_eq!(first.response.course_ids(), second.response.course_ids());
    assert_eq!(first.verdicts, second.verdicts);
}

#[tokio::test]
async fn disjoint_categories_are_always_rejected() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("SEARCH"));

    let result = fx.say(SessionId::new(), "programming courses in java").await;

    let disjoint = fx.disjoint_for("software_development");
    assert!(!disjoint.is_empty());
    for record in &result.verdicts {
        if disjoint.iter().any(|c| c == fx.category(record.course_id.as_str())) {
            assert!(!record.verdict.is_accept(), "{} accepted", record.course_id);
        }
    }
    assert!(result
        .response
        .courses
        .iter()
        .all(|c| c.title != "Java Coffee Brewing"));
    assert_grounded(&result);
}

#[tokio::test]
async fn python_search_never_surfaces_snake_care() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("SEARCH"));

    let result = fx.say(SessionId::new(), "data science with python").await;

    assert!(!result.response.courses.is_empty());
    assert!(result
        .response
        .courses
        .iter()
        .all(|c| c.title != "Python Snake Care Guide"));
    assert!(result
        .response
        .courses
        .iter()
        .all(|c| fx.category(c.id.as_str()) != "Lifestyle"));
}

#[tokio::test]
async fn draft_naming_an_unguarded_course_falls_back_to_the_template() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Start with SQL for Data Analysis, then relax with Java Coffee Brewing."),
    );

    let result = fx.say(SessionId::new(), "SQL courses").await;

    assert!(!result.response.courses.is_empty());
    assert_eq!(result.response.answer, template_for(&result));
    assert!(!result.response.answer.contains("Java Coffee"));
    assert_grounded(&result);
}

#[tokio::test]
async fn draft_inventing_a_course_falls_back_to_the_template() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Take SQL for Data Analysis, then our Career Accelerator Masterclass by Omar Fathy."),
    );

    let result = fx.say(SessionId::new(), "SQL courses").await;

    assert!(result.response.course_ids().iter().any(|id| id.as_str() == "c02"));
    assert_eq!(result.response.answer, template_for(&result));
    assert!(!result.response.answer.contains("Masterclass"));
}

#[tokio::test]
async fn cited_draft_is_shown_without_markers() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Start with [[SQL for Data Analysis]] and practise on real tables."),
    );

    let result = fx.say(SessionId::new(), "SQL courses").await;

    assert_eq!(
        result.response.answer,
        "Start with SQL for Data Analysis and practise on real tables."
    );
}

#[tokio::test]
async fn contrast_words_do_not_page_past_earlier_results() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_response("Here are some options.")
            .with_intent("SEARCH")
            .with_response("Here are some options."),
    );
    let session = SessionId::new();

    let first = fx.say(session, "SQL courses").await;
    assert!(first.response.course_ids().iter().any(|id| id.as_str() == "c02"));

    let second = fx.say(session, "SQL and other database tools").await;
    assert!(second.response.course_ids().iter().any(|id| id.as_str() == "c02"));
    assert_grounded(&second);
}

#[tokio::test]
async fn repeating_a_plan_answer_does_not_change_the_plan() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("PLAN_REQUEST"));
    let session = SessionId::new();

    let asked = fx.say(session, "I need a study plan to become a data analyst").await;
    assert!(asked.response.ask.is_some());

    let asked = fx.say(session, "8 weeks").await;
    assert_eq!(asked.response.intent, Intent::PlanRequest);
    assert!(asked.response.ask.is_some());

    let first = fx.say(session, "2 hours a day").await;
    let again = fx.say(session, "2 hours a day").await;

    let plan = first.response.learning_plan.as_ref().unwrap();
    assert_eq!(plan.duration_weeks, 8);
    assert_eq!(first.response.learning_plan, again.response.learning_plan);
    assert_eq!(first.response.course_ids(), again.response.course_ids());
    assert_grounded(&first);
    // Only the opening message needed the model.
    assert_eq!(fx.ai.calls_for(RequestPurpose::Classification), 1);
    assert_eq!(fx.ai.calls_for(RequestPurpose::Drafting), 0);
}

// ════════════════════════════════════════════════════════════════════════════
// Exploration
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn exploration_walks_interest_then_track_then_results() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("CAREER_GUIDANCE"));
    let session = SessionId::new();

    let interests = fx.say(session, "I don't know what career to choose").await;
    let ask = interests.response.ask.as_ref().unwrap();
    assert_eq!(ask.choices.len(), fx.taxonomy.interests().len());

    let tracks = fx.say(session, "A").await;
    assert_eq!(tracks.response.intent, Intent::ExplorationChoice);
    assert!(tracks.response.ask.is_some());

    let results = fx.say(session, "Data Analyst").await;
    assert_eq!(results.response.intent, Intent::ExplorationChoice);
    assert!(!results.response.courses.is_empty());
    assert_grounded(&results);

    let data_ai = fx.taxonomy.domain(&DomainId::new("data_ai")).unwrap();
    for card in &results.response.courses {
        assert!(data_ai.categories.iter().any(|c| c == fx.category(card.id.as_str())));
    }
    // Two classifications were gated; only the first reached the model.
    assert_eq!(fx.ai.calls_for(RequestPurpose::Classification), 1);
}

#[tokio::test]
async fn named_role_skips_the_diagnostic() {
    let fx = Fixture::new(MockAIProvider::new().with_intent("CAREER_GUIDANCE"));

    let result = fx.say(SessionId::new(), "I want to become a frontend developer").await;

    assert!(result.response.ask.is_none());
    assert!(!result.response.courses.is_empty());
    let taught: Vec<SkillId> = fx
        .taxonomy
        .role(&RoleId::new("frontend_developer"))
        .map(|r| r.skill_ids())
        .unwrap_or_default();
    assert!(!taught.is_empty());
    assert_grounded(&result);
}

// ════════════════════════════════════════════════════════════════════════════
// Failures
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn model_outage_is_upstream_unavailable() {
    let fx = Fixture::new(MockAIProvider::new().with_error(MockError::Unavailable {
        message: "overloaded".to_string(),
    }));

    let err = fx
        .messages
        .handle(HandleMessageCommand::new(SessionId::new(), "teach me SQL"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::LanguageModel,
            ..
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn draft_failure_aborts_the_turn_instead_of_answering_unguarded() {
    let fx = Fixture::new(
        MockAIProvider::new()
            .with_intent("SEARCH")
            .with_error(MockError::Timeout { timeout_secs: 20 }),
    );
    let session = SessionId::new();

    let err = fx
        .messages
        .handle(HandleMessageCommand::new(session, "SQL courses"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    // Nothing from the failed turn was committed.
    let next = fx.say(session, "How much is the subscription?").await;
    assert_eq!(next.state_version, 1);
}

struct BrokenStore;

#[async_trait]
impl ConversationStore for BrokenStore {
    async fn load(&self, _session_id: SessionId) -> Result<ConversationState, ConversationStoreError> {
        Err(ConversationStoreError::IoError("disk unavailable".to_string()))
    }

    async fn save(
        &self,
        _state: &ConversationState,
        _expected_version: u64,
    ) -> Result<(), ConversationStoreError> {
        Err(ConversationStoreError::IoError("disk unavailable".to_string()))
    }
}

#[tokio::test]
async fn store_outage_is_upstream_unavailable() {
    let fx = Fixture::with_store(MockAIProvider::new(), Arc::new(BrokenStore));

    let err = fx
        .messages
        .handle(HandleMessageCommand::new(SessionId::new(), "How much does it cost?"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::ConversationStore,
            ..
        }
    ));
    assert_eq!(fx.ai.call_count(), 0);
}

#[tokio::test]
async fn blank_message_is_invalid_input() {
    let fx = Fixture::new(MockAIProvider::new());

    let err = fx
        .messages
        .handle(HandleMessageCommand::new(SessionId::new(), "  \n "))
        .await
        .unwrap_err();

    assert!(matches!(err, HandleMessageError::InvalidInput(_)));
    assert!(!err.is_retryable());
}
