//! HandleMessageHandler - one chat turn, message in, structured response out.
//!
//! The turn works on a copy of the session state and commits it only once
//! the response is fully built, so a failed or abandoned turn leaves the
//! stored state untouched.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::pipeline::{GuidancePipeline, TurnIds};
use crate::domain::catalog::{CatalogIndex, CourseId};
use crate::domain::conversation::{
    ChoiceTarget, ConversationState, FlowEvent, PlanSlot, SlotUpdate,
};
use crate::domain::foundation::{Language, RequestId, SessionId};
use crate::domain::guidance::{
    match_choice, Ask, GuardContext, GuardRecord, Intent, PlanCourse, ResponseBuilder,
    RetrievalQuery, RouterError, RouterInput, StructuredResponse,
};
use crate::domain::taxonomy::{DomainId, RoleId, SkillId};
use crate::ports::ConversationStoreError;

/// Command to handle one user message.
#[derive(Debug, Clone)]
pub struct HandleMessageCommand {
    pub session_id: SessionId,
    pub message: String,
}

impl HandleMessageCommand {
    pub fn new(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: message.into(),
        }
    }
}

/// Result of a handled turn.
#[derive(Debug, Clone)]
pub struct HandleMessageResult {
    pub response: StructuredResponse,
    /// One verdict per retrieved candidate, in retrieval order.
    pub verdicts: Vec<GuardRecord>,
    /// Version the session state was committed at.
    pub state_version: u64,
}

/// The collaborator that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
    LanguageModel,
    ConversationStore,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamKind::LanguageModel => f.write_str("language_model"),
            UpstreamKind::ConversationStore => f.write_str("conversation_store"),
        }
    }
}

/// Errors that abort a turn.
#[derive(Debug, Clone, Error)]
pub enum HandleMessageError {
    /// A collaborator was unreachable or timed out. The caller may retry.
    #[error("{source_kind} unavailable: {message}")]
    UpstreamUnavailable {
        source_kind: UpstreamKind,
        message: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl HandleMessageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandleMessageError::UpstreamUnavailable { .. })
    }
}

impl From<RouterError> for HandleMessageError {
    fn from(err: RouterError) -> Self {
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::LanguageModel,
            message: err.to_string(),
        }
    }
}

impl From<ConversationStoreError> for HandleMessageError {
    fn from(err: ConversationStoreError) -> Self {
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::ConversationStore,
            message: err.to_string(),
        }
    }
}

/// A built reply before the state is committed.
pub(super) struct TurnReply {
    pub response: StructuredResponse,
    pub verdicts: Vec<GuardRecord>,
}

impl TurnReply {
    fn plain(response: StructuredResponse) -> Self {
        Self {
            response,
            verdicts: Vec::new(),
        }
    }

    fn ask(intent: Intent, ids: TurnIds, ask: Ask) -> Self {
        Self::plain(
            StructuredResponse::text(
                intent,
                ids.language,
                ResponseBuilder::ask_preamble(ids.language),
                ids.session_id,
                ids.request_id,
            )
            .with_ask(ask),
        )
    }
}

/// What to retrieve for a results turn.
struct ResultsRequest<'a> {
    intent: Intent,
    domain: Option<&'a DomainId>,
    skills: &'a [SkillId],
    keywords: &'a [String],
    wants_more: bool,
    notes: Option<&'a str>,
}

/// Moves the flow; an event the flow rejects resets it rather than
/// failing the turn.
pub(super) fn advance(state: &mut ConversationState, event: FlowEvent) {
    if let Err(err) = state.apply_event(event) {
        warn!(session_id = %state.session_id, error = %err, "flow event rejected, resetting flow");
        state.flow = Default::default();
    }
}

/// Ids shown last turn, when that turn ran in the flow the session is in now.
pub(super) fn previously_shown(state: &ConversationState) -> Vec<CourseId> {
    if state.last_candidates_flow == state.flow.kind() {
        state.last_candidate_ids()
    } else {
        Vec::new()
    }
}

/// Handler for chat messages.
pub struct HandleMessageHandler {
    pipeline: Arc<GuidancePipeline>,
}

impl HandleMessageHandler {
    pub fn new(pipeline: Arc<GuidancePipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn handle(
        &self,
        cmd: HandleMessageCommand,
    ) -> Result<HandleMessageResult, HandleMessageError> {
        let message = cmd.message.trim();
        if message.is_empty() {
            return Err(HandleMessageError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }

        let request_id = RequestId::new();
        // One snapshot for the whole turn, even if a reload lands meanwhile.
        let snapshot = self.pipeline.catalog.current();
        let catalog = &snapshot.index;

        let (mut state, loaded_version) = self.pipeline.load_state(cmd.session_id).await?;
        state.observe_language(Language::detect(message));
        let ids = TurnIds {
            session_id: cmd.session_id,
            request_id,
            language: state.language(),
        };

        let input = RouterInput {
            message,
            history: state.recent_history(self.pipeline.history_turns),
            flow: &state.flow,
            catalog,
            language: ids.language,
            session_id: ids.session_id,
            request_id,
        };
        let classified = self.pipeline.router.classify(&input).await?;

        let reply = match classified.intent {
            Intent::OutOfScope | Intent::Unsafe | Intent::SupportPolicy => {
                let answer =
                    ResponseBuilder::canned_answer(classified.intent, ids.language).unwrap_or_default();
                TurnReply::plain(StructuredResponse::text(
                    classified.intent,
                    ids.language,
                    answer,
                    ids.session_id,
                    request_id,
                ))
            }
            Intent::CvAnalysis => {
                let (answer, ask) = ResponseBuilder::cv_paste_ask(ids.language);
                TurnReply::plain(
                    StructuredResponse::text(
                        Intent::CvAnalysis,
                        ids.language,
                        answer,
                        ids.session_id,
                        request_id,
                    )
                    .with_ask(ask),
                )
            }
            Intent::ExplorationChoice => {
                self.exploration_choice(&mut state, ids, catalog, message)
                    .await?
            }
            Intent::CareerGuidance => {
                self.career_guidance(&mut state, ids, catalog, message)
                    .await?
            }
            Intent::PlanRequest => self.plan_request(&mut state, ids, catalog, message).await?,
            Intent::Search | Intent::TitleUnknownSearch | Intent::CourseDetails => {
                self.search(&mut state, ids, catalog, message, classified.intent)
                    .await?
            }
        };

        let shown = reply.response.course_ids();
        if !shown.is_empty() {
            state.remember_candidates(&shown);
        }
        state.finish_turn(message, &reply.response.answer, self.pipeline.history_turns);
        self.pipeline.save_state(&state, loaded_version).await?;

        info!(
            session_id = %ids.session_id,
            request_id = %request_id,
            intent = %reply.response.intent,
            source = ?classified.source,
            flow = %state.flow.kind(),
            courses = reply.response.courses.len(),
            rejected = reply.verdicts.iter().filter(|v| !v.verdict.is_accept()).count(),
            catalog_version = %snapshot.version,
            "turn complete"
        );

        Ok(HandleMessageResult {
            response: reply.response,
            verdicts: reply.verdicts,
            state_version: state.version,
        })
    }

    // ════════════════════════════════════════════════════════════════════
    // Exploration
    // ════════════════════════════════════════════════════════════════════

    async fn exploration_choice(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
    ) -> Result<TurnReply, HandleMessageError> {
        let target = match_choice(message, state.flow.offered_choices()).map(|c| c.target.clone());

        match target {
            Some(ChoiceTarget::Interest(key)) => {
                let domains = self
                    .pipeline
                    .taxonomy
                    .interests()
                    .iter()
                    .find(|area| area.key == key)
                    .map(|area| area.domains.clone())
                    .unwrap_or_default();
                let (offered, ask) = self.pipeline.builder.track_choices(&domains, ids.language);
                if offered.is_empty() {
                    return self
                        .browse_domains(state, ids, catalog, message, Intent::ExplorationChoice, domains)
                        .await;
                }
                advance(
                    state,
                    FlowEvent::InterestChosen {
                        interest: key,
                        domains,
                        offered,
                    },
                );
                Ok(TurnReply::ask(Intent::ExplorationChoice, ids, ask))
            }
            Some(ChoiceTarget::Track(role)) => {
                advance(state, FlowEvent::TrackChosen { track: role.clone() });
                self.track_results(state, ids, catalog, message, Intent::ExplorationChoice, &role)
                    .await
            }
            // The offered choices changed under the gate; treat it as a search.
            None => self.search(state, ids, catalog, message, Intent::Search).await,
        }
    }

    async fn career_guidance(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
    ) -> Result<TurnReply, HandleMessageError> {
        let intent = Intent::CareerGuidance;
        let extraction = self
            .pipeline
            .extractor
            .extract(message, intent, &state.flow, &state.slots);
        state.apply_slots(&extraction.update);
        let update = &extraction.update;

        if let Some(role) = update
            .role
            .as_ref()
            .and_then(|r| self.pipeline.taxonomy.role(r))
        {
            advance(
                state,
                FlowEvent::FastPath {
                    domains: vec![role.domain.clone()],
                    track: Some(role.id.clone()),
                },
            );
            let role_id = role.id.clone();
            return self
                .track_results(state, ids, catalog, message, intent, &role_id)
                .await;
        }

        let skills = update.skills.clone().unwrap_or_default();
        // Skills without a named field belong to the first skill's field.
        let domain = update.domain.clone().or_else(|| {
            skills
                .first()
                .and_then(|s| self.pipeline.taxonomy.skill(s))
                .map(|s| s.domain.clone())
        });

        match domain {
            Some(domain) if !skills.is_empty() => {
                advance(
                    state,
                    FlowEvent::FastPath {
                        domains: vec![domain.clone()],
                        track: None,
                    },
                );
                let request = ResultsRequest {
                    intent,
                    domain: Some(&domain),
                    skills: &skills,
                    keywords: &extraction.keywords,
                    wants_more: extraction.wants_more,
                    notes: None,
                };
                self.results(state, ids, catalog, message, request).await
            }
            Some(domain) => {
                let (offered, ask) = self
                    .pipeline
                    .builder
                    .track_choices(std::slice::from_ref(&domain), ids.language);
                if offered.is_empty() {
                    return self
                        .browse_domains(state, ids, catalog, message, intent, vec![domain])
                        .await;
                }
                advance(
                    state,
                    FlowEvent::DomainResolved {
                        domains: vec![domain],
                        offered,
                    },
                );
                Ok(TurnReply::ask(intent, ids, ask))
            }
            None if extraction.mentioned_domains.len() > 1 => {
                let ask = self
                    .pipeline
                    .builder
                    .domain_ask(&extraction.mentioned_domains, ids.language);
                Ok(TurnReply::ask(intent, ids, ask))
            }
            None => {
                let (offered, ask) = self.pipeline.builder.interest_choices(ids.language);
                if offered.is_empty() {
                    let ask = self.pipeline.builder.domain_ask(&[], ids.language);
                    return Ok(TurnReply::ask(intent, ids, ask));
                }
                advance(state, FlowEvent::ExplorationStarted { offered });
                Ok(TurnReply::ask(intent, ids, ask))
            }
        }
    }

    /// Results for a track: its skills, inside its field, with its roadmap.
    async fn track_results(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
        intent: Intent,
        role_id: &RoleId,
    ) -> Result<TurnReply, HandleMessageError> {
        let taxonomy = self.pipeline.taxonomy.clone();
        let Some(role) = taxonomy.role(role_id) else {
            return Ok(TurnReply::plain(StructuredResponse::text(
                intent,
                ids.language,
                ResponseBuilder::zero_result_answer(ids.language),
                ids.session_id,
                ids.request_id,
            )));
        };

        let skills = role.skill_ids();
        state.apply_slots(&SlotUpdate {
            domain: Some(role.domain.clone()),
            skills: Some(skills.clone()),
            role: Some(role.id.clone()),
            ..Default::default()
        });

        let notes = role.roadmap.as_ref().map(|r| r.get(ids.language).to_string());
        let request = ResultsRequest {
            intent,
            domain: Some(&role.domain),
            skills: &skills,
            keywords: &[],
            wants_more: false,
            notes: notes.as_deref(),
        };
        self.results(state, ids, catalog, message, request).await
    }

    /// A field with no tracks to offer: show its core courses directly.
    async fn browse_domains(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
        intent: Intent,
        domains: Vec<DomainId>,
    ) -> Result<TurnReply, HandleMessageError> {
        let primary = domains.first().cloned();
        advance(state, FlowEvent::FastPath { domains, track: None });
        let request = ResultsRequest {
            intent,
            domain: primary.as_ref(),
            skills: &[],
            keywords: &[],
            wants_more: false,
            notes: None,
        };
        self.results(state, ids, catalog, message, request).await
    }

    // ════════════════════════════════════════════════════════════════════
    // Plans
    // ════════════════════════════════════════════════════════════════════

    async fn plan_request(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
    ) -> Result<TurnReply, HandleMessageError> {
        let intent = Intent::PlanRequest;
        let extraction = self
            .pipeline
            .extractor
            .extract(message, intent, &state.flow, &state.slots);
        state.apply_slots(&extraction.update);

        // Required slots are asked for one at a time, in this order.
        let slots = state.slots.clone();
        let (weeks, hours_per_day) = match (slots.has_no_topic(), slots.duration_weeks, slots.hours_per_day) {
            (false, Some(weeks), Some(hours)) => (weeks, hours),
            (no_topic, weeks, _) => {
                let slot = if no_topic {
                    PlanSlot::Domain
                } else if weeks.is_none() {
                    PlanSlot::Duration
                } else {
                    PlanSlot::HoursPerDay
                };
                advance(state, FlowEvent::PlanSlotRequested(slot));
                let ask = if slot == PlanSlot::Domain && extraction.mentioned_domains.len() > 1 {
                    self.pipeline
                        .builder
                        .domain_ask(&extraction.mentioned_domains, ids.language)
                } else {
                    self.pipeline.builder.plan_slot_ask(slot, ids.language)
                };
                return Ok(TurnReply::ask(intent, ids, ask));
            }
        };

        let taxonomy = self.pipeline.taxonomy.clone();
        let role = slots.role.as_ref().and_then(|r| taxonomy.role(r));
        let required: Vec<SkillId> = if slots.skills.is_empty() {
            role.map(|r| r.skill_ids()).unwrap_or_default()
        } else {
            slots.skills.clone()
        };
        let domain = slots.domain.clone().or_else(|| role.map(|r| r.domain.clone()));

        advance(state, FlowEvent::PlanCompleted);
        let shown = previously_shown(state);
        let query = RetrievalQuery {
            intent,
            message,
            domain: domain.as_ref(),
            skills: &required,
            keywords: &extraction.keywords,
        };
        let context = GuardContext {
            domain: domain.as_ref(),
            skills: &required,
            level: slots.level,
            previously_shown: &shown,
            wants_more: extraction.wants_more,
        };
        let outcome = self.pipeline.retrieve_guarded(catalog, &query, &context);

        let courses: Vec<PlanCourse> = outcome
            .accepted
            .iter()
            .filter_map(|candidate| {
                let course = catalog.course(candidate.position)?;
                Some(PlanCourse {
                    course_id: course.id.clone(),
                    title: course.title.clone(),
                    hours: course.duration_hours,
                    skills: catalog
                        .skills_of(candidate.position)
                        .map(|taught| taught.iter().cloned().collect())
                        .unwrap_or_default(),
                })
            })
            .collect();
        let plan = self
            .pipeline
            .planner
            .build(weeks, hours_per_day, &courses, &required, ids.language);
        let cards = self
            .pipeline
            .builder
            .cards(catalog, &outcome.accepted, domain.as_ref(), ids.language);
        let answer = self.pipeline.builder.plan_answer(&plan, ids.language);

        Ok(TurnReply {
            response: StructuredResponse::text(intent, ids.language, answer, ids.session_id, ids.request_id)
                .with_courses(cards)
                .with_plan(plan),
            verdicts: outcome.verdicts,
        })
    }

    // ════════════════════════════════════════════════════════════════════
    // Search
    // ════════════════════════════════════════════════════════════════════

    async fn search(
        &self,
        state: &mut ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
        intent: Intent,
    ) -> Result<TurnReply, HandleMessageError> {
        let extraction = self
            .pipeline
            .extractor
            .extract(message, intent, &state.flow, &state.slots);
        state.apply_slots(&extraction.update);
        advance(state, FlowEvent::Reset);

        if extraction.ambiguous {
            let ask = self
                .pipeline
                .builder
                .domain_ask(&extraction.mentioned_domains, ids.language);
            return Ok(TurnReply::ask(intent, ids, ask));
        }

        // A course lookup is judged against this message alone; a search
        // builds on what the session already resolved.
        let (domain, skills) = if intent.is_title_lookup() {
            (
                extraction.update.domain.clone(),
                extraction.update.skills.clone().unwrap_or_default(),
            )
        } else {
            (state.slots.domain.clone(), state.slots.skills.clone())
        };

        let request = ResultsRequest {
            intent,
            domain: domain.as_ref(),
            skills: &skills,
            keywords: &extraction.keywords,
            wants_more: extraction.wants_more,
            notes: None,
        };
        self.results(state, ids, catalog, message, request).await
    }

    /// Retrieve, guard, draft, re-check.
    async fn results(
        &self,
        state: &ConversationState,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
        request: ResultsRequest<'_>,
    ) -> Result<TurnReply, HandleMessageError> {
        let shown = previously_shown(state);
        let query = RetrievalQuery {
            intent: request.intent,
            message,
            domain: request.domain,
            skills: request.skills,
            keywords: request.keywords,
        };
        let context = GuardContext {
            domain: request.domain,
            skills: request.skills,
            level: state.slots.level,
            previously_shown: &shown,
            wants_more: request.wants_more,
        };
        let outcome = self.pipeline.retrieve_guarded(catalog, &query, &context);
        if outcome.exhausted() {
            info!(
                request_id = %ids.request_id,
                rejected = outcome.rejected_count(),
                "every candidate rejected by the relevance guard"
            );
        }

        let cards = self
            .pipeline
            .builder
            .cards(catalog, &outcome.accepted, request.domain, ids.language);
        let answer = self
            .pipeline
            .grounded_answer(
                ids,
                catalog,
                message,
                request.intent,
                &cards,
                request.skills,
                request.notes,
            )
            .await?;

        Ok(TurnReply {
            response: StructuredResponse::text(
                request.intent,
                ids.language,
                answer,
                ids.session_id,
                ids.request_id,
            )
            .with_courses(cards),
            verdicts: outcome.verdicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AIError;

    #[test]
    fn command_keeps_message_verbatim() {
        let session_id = SessionId::new();
        let cmd = HandleMessageCommand::new(session_id, "  SQL courses ");
        assert_eq!(cmd.session_id, session_id);
        assert_eq!(cmd.message, "  SQL courses ");
    }

    #[test]
    fn router_failure_is_a_retryable_model_outage() {
        let err: HandleMessageError = RouterError::Upstream(AIError::unavailable("overloaded")).into();
        assert!(matches!(
            err,
            HandleMessageError::UpstreamUnavailable {
                source_kind: UpstreamKind::LanguageModel,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("language_model unavailable"));
    }

    #[test]
    fn version_conflict_is_a_retryable_store_outage() {
        let err: HandleMessageError = ConversationStoreError::VersionConflict {
            session_id: SessionId::new(),
            expected: 2,
            found: 3,
        }
        .into();
        assert!(matches!(
            err,
            HandleMessageError::UpstreamUnavailable {
                source_kind: UpstreamKind::ConversationStore,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_input_is_not_retryable() {
        let err = HandleMessageError::InvalidInput("message must not be empty".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn upstream_kind_serializes_snake_case() {
        let json = serde_json::to_string(&UpstreamKind::ConversationStore).unwrap();
        assert_eq!(json, "\"conversation_store\"");
    }
}
