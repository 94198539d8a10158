//! Intent routing: deterministic gates first, then the language model.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::extractor::SemanticExtractor;
use super::intent::{Intent, IntentResult, IntentSource};
use crate::domain::catalog::CatalogIndex;
use crate::domain::conversation::{Flow, HistoryEntry, OfferedChoice, Speaker};
use crate::domain::foundation::text::{contains_any, contains_phrase, fold, tokens};
use crate::domain::foundation::{Language, RequestId, SessionId};
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, RequestMetadata, RequestPurpose};

/// Harmful-action verbs; only unsafe together with a target.
const HARM_VERBS: &[&str] = &[
    "hack", "hacking", "steal", "stealing", "crack", "cracking", "spy", "اختراق", "اخترق", "اهكر",
    "تهكير", "هكر", "سرقه", "اسرق", "تجسس",
];
const HARM_TARGETS: &[&str] = &[
    "account", "accounts", "password", "passwords", "facebook", "instagram", "whatsapp", "wifi",
    "email", "phone", "someone", "software", "license", "حساب", "حسابات", "باسورد", "كلمه السر",
    "فيسبوك", "انستجرام", "واتساب", "واي فاي", "ايميل", "موبايل", "تليفون", "برنامج",
];
/// Unsafe on their own.
const HARM_PHRASES: &[&str] = &[
    "keylogger", "ransomware", "malware", "make a virus", "pirated", "piracy", "carding",
    "برامج مكركه", "نسخه مكركه", "كراك", "اعمل فيروس", "فيرس",
];
/// Protective contexts that make security talk safe.
const SAFE_CONTEXT: &[&str] = &[
    "ethical hacking", "ethical hacker", "penetration testing", "pentest", "pentesting",
    "protect", "protection", "defend", "defense", "secure my", "اختراق اخلاقي", "الاختراق الاخلاقي",
    "اختبار الاختراق", "حمايه", "احمي", "الحمايه",
];
const POLICY_KEYWORDS: &[&str] = &[
    "price", "prices", "pricing", "cost", "how much", "subscription", "subscribe", "refund",
    "certificate", "certificates", "payment", "pay", "discount", "contact us", "support team",
    "سعر", "اسعار", "السعر", "بكام", "تكلفه", "اشتراك", "الاشتراك", "استرداد", "فلوسي", "شهاده",
    "الشهاده", "دفع", "الدفع", "خصم", "الدعم الفني", "خدمه العملاء",
];

/// Arabic choice letters, in order.
const ARABIC_CHOICE_LETTERS: [&str; 4] = ["ا", "ب", "ج", "د"];

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// The model could not classify; callers must not guess an intent.
    #[error("intent classification unavailable: {0}")]
    Upstream(#[from] AIError),
}

/// Routing tunables.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub timeout: Duration,
    pub temperature: f32,
    pub history_turns: usize,
}

/// What the router looks at for one message.
pub struct RouterInput<'a> {
    pub message: &'a str,
    pub history: &'a [HistoryEntry],
    pub flow: &'a Flow,
    pub catalog: &'a CatalogIndex,
    pub language: Language,
    pub session_id: SessionId,
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
struct ModelLabel {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
}

pub struct IntentRouter {
    ai: Arc<dyn AIProvider>,
    extractor: Arc<SemanticExtractor>,
    settings: RouterSettings,
}

impl IntentRouter {
    pub fn new(ai: Arc<dyn AIProvider>, extractor: Arc<SemanticExtractor>, settings: RouterSettings) -> Self {
        Self {
            ai,
            extractor,
            settings,
        }
    }

    /// Classifies a message.
    ///
    /// Gates answer without the model. Otherwise the model picks from the
    /// fixed label set; an unknown label falls back to `SEARCH`, a model
    /// failure is an error.
    pub async fn classify(&self, input: &RouterInput<'_>) -> Result<IntentResult, RouterError> {
        if let Some(intent) = self.gate(input.message, input.flow) {
            debug!(intent = %intent, "intent decided by gate");
            return Ok(IntentResult::gated(intent, input.language));
        }

        let request = self.classification_request(input);
        let response = tokio::time::timeout(self.settings.timeout, self.ai.complete(request))
            .await
            .map_err(|_| AIError::Timeout {
                timeout_secs: self.settings.timeout.as_secs(),
            })??;

        let (mut intent, confidence) = match parse_label(&response.content) {
            Some(parsed) => parsed,
            None => {
                warn!(label = %response.content.trim(), "unrecognised intent label, using SEARCH");
                (Intent::Search, 0.0)
            }
        };
        if intent == Intent::ExplorationChoice {
            intent = Intent::Search;
        }

        if intent == Intent::Search && input.catalog.near_exact_title(input.message).is_some() {
            intent = Intent::CourseDetails;
        }

        Ok(IntentResult {
            intent,
            confidence,
            language: input.language,
            source: IntentSource::Model,
        })
    }

    /// Deterministic gates, in priority order.
    pub fn gate(&self, message: &str, flow: &Flow) -> Option<Intent> {
        let folded = fold(message);
        if is_unsafe(&folded) {
            return Some(Intent::Unsafe);
        }
        if contains_any(&folded, POLICY_KEYWORDS) {
            return Some(Intent::SupportPolicy);
        }
        if match_choice(message, flow.offered_choices()).is_some() {
            return Some(Intent::ExplorationChoice);
        }
        if let Flow::PlanBuilding(plan) = flow {
            if self.extractor.is_plan_answer(message, plan.awaiting) {
                return Some(Intent::PlanRequest);
            }
        }
        None
    }

    fn classification_request(&self, input: &RouterInput<'_>) -> CompletionRequest {
        let metadata = RequestMetadata::new(input.session_id, input.request_id, RequestPurpose::Classification);
        let mut request = CompletionRequest::new(metadata)
            .with_system_prompt(classification_prompt())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(60);

        let keep = (self.settings.history_turns * 2).min(input.history.len());
        for entry in &input.history[input.history.len() - keep..] {
            let role = match entry.speaker {
                Speaker::User => MessageRole::User,
                Speaker::Assistant => MessageRole::Assistant,
            };
            request = request.with_message(role, entry.text.clone());
        }
        request.with_message(MessageRole::User, input.message)
    }
}

fn classification_prompt() -> String {
    let labels: Vec<&str> = Intent::classifiable().iter().map(|i| i.label()).collect();
    format!(
        "You classify messages sent to a bilingual (Arabic/English) career-guidance assistant \
         that recommends courses from a fixed catalog.\n\
         Allowed labels: {}.\n\
         SEARCH: wants courses on a topic or skill. \
         CAREER_GUIDANCE: unsure what to learn or which career to pursue. \
         PLAN_REQUEST: wants a study plan or schedule. \
         COURSE_DETAILS: asks about one named course. \
         TITLE_UNKNOWN_SEARCH: describes one course without knowing its title. \
         CV_ANALYSIS: wants a CV or resume reviewed. \
         OUT_OF_SCOPE: anything unrelated to learning or careers. \
         UNSAFE: harmful or illegal requests. \
         SUPPORT_POLICY: pricing, payment, certificates or account support.\n\
         Reply with JSON only: {{\"intent\": \"<LABEL>\", \"confidence\": <0..1>}}",
        labels.join(", ")
    )
}

/// Reads the model's answer: JSON (optionally fenced) or a bare label.
fn parse_label(content: &str) -> Option<(Intent, f32)> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Some(json) = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
    {
        if let Ok(label) = serde_json::from_str::<ModelLabel>(json) {
            let confidence = label.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
            return Intent::from_label(&label.intent).map(|i| (i, confidence));
        }
    }
    Intent::from_label(trimmed).map(|i| (i, 0.5))
}

fn is_unsafe(folded: &str) -> bool {
    if contains_any(folded, SAFE_CONTEXT) {
        return false;
    }
    contains_any(folded, HARM_PHRASES)
        || (contains_any(folded, HARM_VERBS) && contains_any(folded, HARM_TARGETS))
}

/// The offered choice a message selects: its letter (A-D or أ-د), its
/// number (1-4), or its label.
pub fn match_choice<'a>(message: &str, choices: &'a [OfferedChoice]) -> Option<&'a OfferedChoice> {
    if choices.is_empty() {
        return None;
    }
    let folded = fold(message);
    let toks = tokens(&folded);

    let picked = match toks.as_slice() {
        [only] | ["option", only] | ["choice", only] | ["اختيار", only] => {
            choice_position(only).and_then(|i| choices.get(i)).or_else(|| {
                choices
                    .iter()
                    .find(|c| fold(&c.key) == *only)
            })
        }
        _ => None,
    };
    if picked.is_some() {
        return picked;
    }

    choices.iter().find(|choice| {
        let label = fold(&choice.label);
        label == folded
            || (tokens(&label).len() >= 2 && contains_phrase(&folded, &label))
            || choice
                .aliases
                .iter()
                .any(|alias| contains_phrase(&folded, &fold(alias)))
    })
}

fn choice_position(token: &str) -> Option<usize> {
    match token {
        "a" | "1" => Some(0),
        "b" | "2" => Some(1),
        "c" | "3" => Some(2),
        "d" | "4" => Some(3),
        _ => ARABIC_CHOICE_LETTERS.iter().position(|l| *l == token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::domain::catalog::{CourseId, CourseLevel, CourseRecord, Embedder};
    use crate::domain::conversation::{
        ChoiceTarget, ExplorationFlow, ExplorationStage, PlanBuildingFlow, PlanSlot,
    };
    use crate::domain::taxonomy::{SkillTaxonomy, TaxonomyDocument};

    fn router(mock: MockAIProvider) -> IntentRouter {
        let taxonomy = Arc::new(SkillTaxonomy::from_document(TaxonomyDocument::default()).unwrap());
        IntentRouter::new(
            Arc::new(mock),
            Arc::new(SemanticExtractor::new(taxonomy, 5)),
            RouterSettings {
                timeout: Duration::from_secs(5),
                temperature: 0.0,
                history_turns: 3,
            },
        )
    }

    fn catalog() -> CatalogIndex {
        let taxonomy = SkillTaxonomy::from_document(TaxonomyDocument::default()).unwrap();
        let course = CourseRecord {
            id: CourseId::new("c1").unwrap(),
            title: "Excel for Business Analysis".into(),
            category: "Business".into(),
            level: CourseLevel::Beginner,
            duration_hours: Some(6.0),
            skills: vec!["excel".into()],
            description: String::new(),
            instructor: "Mona".into(),
            cover: String::new(),
            published: None,
        };
        CatalogIndex::build(vec![course], &taxonomy, Embedder::new(32))
    }

    fn input<'a>(message: &'a str, flow: &'a Flow, catalog: &'a CatalogIndex) -> RouterInput<'a> {
        RouterInput {
            message,
            history: &[],
            flow,
            catalog,
            language: Language::En,
            session_id: SessionId::new(),
            request_id: RequestId::new(),
        }
    }

    fn exploration_with_choices() -> Flow {
        Flow::Exploration(ExplorationFlow {
            stage: ExplorationStage::DomainChoice,
            offered: vec![
                OfferedChoice {
                    key: "A".into(),
                    label: "Technology and data".into(),
                    aliases: vec!["tech".into()],
                    target: ChoiceTarget::Interest("A".into()),
                },
                OfferedChoice {
                    key: "B".into(),
                    label: "Business and organising".into(),
                    aliases: vec![],
                    target: ChoiceTarget::Interest("B".into()),
                },
            ],
            interest: None,
            domains: vec![],
            track: None,
        })
    }

    #[tokio::test]
    async fn unsafe_request_is_gated_without_model() {
        let mock = MockAIProvider::new();
        let router = router(mock.clone());
        let catalog = catalog();
        let result = router
            .classify(&input("how do I hack my friend's facebook account", &Flow::None, &catalog))
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::Unsafe);
        assert_eq!(result.source, IntentSource::Gate);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn ethical_hacking_is_not_unsafe() {
        assert!(!is_unsafe(&fold("ethical hacking course to protect accounts")));
        assert!(is_unsafe(&fold("عايز اهكر حساب فيسبوك")));
    }

    #[test]
    fn policy_keywords_route_to_support() {
        let router = router(MockAIProvider::new());
        assert_eq!(router.gate("How much is the subscription?", &Flow::None), Some(Intent::SupportPolicy));
        assert_eq!(router.gate("الكورس ده بكام", &Flow::None), Some(Intent::SupportPolicy));
    }

    #[test]
    fn exploration_choice_by_letter_number_and_label() {
        let flow = exploration_with_choices();
        let choices = flow.offered_choices();
        assert_eq!(match_choice("b", choices).map(|c| c.key.as_str()), Some("B"));
        assert_eq!(match_choice("2", choices).map(|c| c.key.as_str()), Some("B"));
        assert_eq!(match_choice("أ", choices).map(|c| c.key.as_str()), Some("A"));
        assert_eq!(match_choice("option A", choices).map(|c| c.key.as_str()), Some("A"));
        assert_eq!(
            match_choice("I like technology and data", choices).map(|c| c.key.as_str()),
            Some("A")
        );
        assert!(match_choice("something else entirely", choices).is_none());
        assert!(match_choice("a", &[]).is_none());
    }

    #[test]
    fn plan_answers_continue_plan_flow() {
        let router = router(MockAIProvider::new());
        let flow = Flow::PlanBuilding(PlanBuildingFlow {
            awaiting: Some(PlanSlot::HoursPerDay),
            completed: false,
        });
        assert_eq!(router.gate("2 hours a day", &flow), Some(Intent::PlanRequest));
        assert_eq!(router.gate("3", &flow), Some(Intent::PlanRequest));
        assert_eq!(router.gate("3", &Flow::None), None);
    }

    #[tokio::test]
    async fn model_label_is_parsed() {
        let mock = MockAIProvider::new().with_response("```json\n{\"intent\": \"PLAN_REQUEST\", \"confidence\": 0.9}\n```");
        let router = router(mock.clone());
        let catalog = catalog();
        let result = router
            .classify(&input("make me a study plan", &Flow::None, &catalog))
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::PlanRequest);
        assert!((result.confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_label_falls_back_to_search() {
        let mock = MockAIProvider::new().with_response("{\"intent\": \"WEATHER\"}");
        let router = router(mock);
        let catalog = catalog();
        let result = router
            .classify(&input("something", &Flow::None, &catalog))
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::Search);
    }

    #[tokio::test]
    async fn exact_title_upgrades_search_to_course_details() {
        let mock = MockAIProvider::new().with_response("SEARCH");
        let router = router(mock);
        let catalog = catalog();
        let result = router
            .classify(&input("Tell me about Excel for Business Analysis", &Flow::None, &catalog))
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::CourseDetails);
    }

    #[tokio::test]
    async fn model_failure_is_an_error_not_a_guess() {
        let mock = MockAIProvider::new().with_error(MockError::Unavailable {
            message: "down".into(),
        });
        let router = router(mock);
        let catalog = catalog();
        let err = router
            .classify(&input("sql courses", &Flow::None, &catalog))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Upstream(_)));
    }
}
