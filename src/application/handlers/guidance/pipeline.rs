//! GuidancePipeline - the stages and collaborators one turn runs through.
//!
//! Handlers own the turn logic; the pipeline owns the pieces they share:
//! state load/save with timeouts, retrieval followed by the guard, and the
//! draft-then-recheck answer path.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::handle_message::{HandleMessageError, UpstreamKind};
use crate::domain::catalog::{CatalogHandle, CatalogIndex, CourseId};
use crate::domain::conversation::ConversationState;
use crate::domain::foundation::{Language, RequestId, SessionId};
use crate::domain::guidance::{
    AnswerDrafter, ConsistencyChecker, CourseCard, CvScorer, DraftContext, DraftError,
    DraftSettings, GuardContext, GuardOutcome, GuardPolicy, Intent, IntentRouter, PlanSettings,
    RelevanceGuard, ResponseBuilder, RetrievalQuery, RetrievalSettings, Retriever, RouterSettings,
    SemanticExtractor, StudyPlanner,
};
use crate::domain::taxonomy::{SkillId, SkillTaxonomy};
use crate::ports::{AIProvider, ConversationStore, ConversationStoreError};

/// Tunables for every stage.
#[derive(Debug, Clone)]
pub struct GuidanceSettings {
    pub router: RouterSettings,
    pub draft: DraftSettings,
    pub retrieval: RetrievalSettings,
    pub guard: GuardPolicy,
    pub plan: PlanSettings,
    /// Exchanges kept in state and shown to the classifier.
    pub history_turns: usize,
    pub store_timeout: Duration,
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        Self {
            router: RouterSettings {
                timeout: Duration::from_secs(20),
                temperature: 0.0,
                history_turns: 6,
            },
            draft: DraftSettings {
                timeout: Duration::from_secs(20),
                temperature: 0.3,
                max_tokens: 700,
            },
            retrieval: RetrievalSettings::default(),
            guard: GuardPolicy {
                strict_level_filter: true,
                ..GuardPolicy::default()
            },
            plan: PlanSettings::default(),
            history_turns: 6,
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-turn identifiers and language.
#[derive(Debug, Clone, Copy)]
pub struct TurnIds {
    pub session_id: SessionId,
    pub request_id: RequestId,
    pub language: Language,
}

pub struct GuidancePipeline {
    pub(super) router: IntentRouter,
    pub(super) extractor: Arc<SemanticExtractor>,
    pub(super) retriever: Retriever,
    pub(super) guard: RelevanceGuard,
    pub(super) builder: ResponseBuilder,
    pub(super) drafter: AnswerDrafter,
    pub(super) planner: StudyPlanner,
    pub(super) cv_scorer: CvScorer,
    pub(super) taxonomy: Arc<SkillTaxonomy>,
    pub(super) catalog: Arc<CatalogHandle>,
    store: Arc<dyn ConversationStore>,
    store_timeout: Duration,
    pub(super) history_turns: usize,
}

impl GuidancePipeline {
    pub fn new(
        ai: Arc<dyn AIProvider>,
        store: Arc<dyn ConversationStore>,
        taxonomy: Arc<SkillTaxonomy>,
        catalog: Arc<CatalogHandle>,
        settings: GuidanceSettings,
    ) -> Self {
        let extractor = Arc::new(SemanticExtractor::new(
            taxonomy.clone(),
            settings.plan.study_days_per_week,
        ));
        Self {
            router: IntentRouter::new(ai.clone(), extractor.clone(), settings.router),
            extractor,
            retriever: Retriever::new(settings.retrieval),
            guard: RelevanceGuard::new(settings.guard),
            builder: ResponseBuilder::new(taxonomy.clone()),
            drafter: AnswerDrafter::new(ai, settings.draft),
            planner: StudyPlanner::new(settings.plan),
            cv_scorer: CvScorer::new(taxonomy.clone()),
            taxonomy,
            catalog,
            store,
            store_timeout: settings.store_timeout,
            history_turns: settings.history_turns,
        }
    }

    pub fn catalog_handle(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    // ════════════════════════════════════════════════════════════════════
    // State
    // ════════════════════════════════════════════════════════════════════

    /// Loads the session's state and the version it was stored at.
    /// A session with no state yet starts fresh at version 0.
    pub(super) async fn load_state(
        &self,
        session_id: SessionId,
    ) -> Result<(ConversationState, u64), HandleMessageError> {
        let loaded = tokio::time::timeout(self.store_timeout, self.store.load(session_id))
            .await
            .map_err(|_| self.store_timed_out())?;

        match loaded {
            Ok(state) => {
                let version = state.version;
                Ok((state, version))
            }
            Err(ConversationStoreError::NotFound(_)) => Ok((ConversationState::new(session_id), 0)),
            Err(err) => Err(err.into()),
        }
    }

    /// Commits the turn's working copy on top of the loaded version.
    pub(super) async fn save_state(
        &self,
        state: &ConversationState,
        loaded_version: u64,
    ) -> Result<(), HandleMessageError> {
        tokio::time::timeout(self.store_timeout, self.store.save(state, loaded_version))
            .await
            .map_err(|_| self.store_timed_out())??;
        Ok(())
    }

    fn store_timed_out(&self) -> HandleMessageError {
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::ConversationStore,
            message: format!("timed out after {}s", self.store_timeout.as_secs()),
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Retrieval
    // ════════════════════════════════════════════════════════════════════

    /// Retrieves candidates and runs every one of them through the guard.
    pub(super) fn retrieve_guarded(
        &self,
        catalog: &CatalogIndex,
        query: &RetrievalQuery<'_>,
        context: &GuardContext<'_>,
    ) -> GuardOutcome {
        let candidates = self.retriever.retrieve(catalog, &self.taxonomy, query);
        self.guard.evaluate(catalog, &self.taxonomy, candidates, context)
    }

    // ════════════════════════════════════════════════════════════════════
    // Answers
    // ════════════════════════════════════════════════════════════════════

    /// Answer text for a set of guarded cards.
    ///
    /// No cards: the zero-result answer, without calling the model.
    /// Otherwise the model drafts from the cards only, and the draft is
    /// re-checked; a draft naming anything outside the guarded set is
    /// replaced by the template.
    pub(super) async fn grounded_answer(
        &self,
        ids: TurnIds,
        catalog: &CatalogIndex,
        message: &str,
        intent: Intent,
        cards: &[CourseCard],
        requested_skills: &[SkillId],
        notes: Option<&str>,
    ) -> Result<String, HandleMessageError> {
        if cards.is_empty() {
            return Ok(ResponseBuilder::zero_result_answer(ids.language));
        }

        let context = DraftContext {
            message,
            intent,
            language: ids.language,
            courses: cards,
            notes,
            session_id: ids.session_id,
            request_id: ids.request_id,
        };
        let draft = self.drafter.draft(&context).await?;

        let guarded: Vec<CourseId> = cards.iter().map(|c| c.id.clone()).collect();
        let report =
            ConsistencyChecker::check(&draft, catalog, &self.taxonomy, &guarded, requested_skills);
        if !report.is_consistent() {
            warn!(
                request_id = %ids.request_id,
                ungrounded_titles = ?report.ungrounded_titles,
                ungrounded_skills = ?report.ungrounded_skills,
                "draft referenced ungrounded items, using template answer"
            );
        } else if draft.is_empty() {
            warn!(request_id = %ids.request_id, "empty draft, using template answer");
        }

        Ok(self
            .builder
            .finalize_answer(&draft, &report, cards, notes, ids.language))
    }
}

impl From<DraftError> for HandleMessageError {
    fn from(err: DraftError) -> Self {
        HandleMessageError::UpstreamUnavailable {
            source_kind: UpstreamKind::LanguageModel,
            message: err.to_string(),
        }
    }
}
