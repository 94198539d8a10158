//! HandleCvHandler - scores extracted CV text against a role.
//!
//! Each upload is scored on its own: prior slots do not influence the
//! score. Courses for the missing skills go through the same guard as any
//! other turn, and the answer is a template, so no model call is made.

use std::sync::Arc;
use tracing::info;

use super::handle_message::{advance, previously_shown, HandleMessageError, TurnReply};
use super::pipeline::{GuidancePipeline, TurnIds};
use crate::domain::conversation::FlowEvent;
use crate::domain::foundation::{Language, RequestId, SessionId};
use crate::domain::guidance::{
    GuardContext, GuardRecord, Intent, ResponseBuilder, RetrievalQuery, StructuredResponse,
};
use crate::domain::taxonomy::SkillId;

/// Command to review a CV.
#[derive(Debug, Clone)]
pub struct HandleCvCommand {
    pub session_id: SessionId,
    /// Plain text already extracted from the uploaded file.
    pub cv_text: String,
    /// Role id or alias the user is aiming for.
    pub target_role: Option<String>,
}

/// Result of a CV review.
#[derive(Debug, Clone)]
pub struct HandleCvResult {
    pub response: StructuredResponse,
    pub verdicts: Vec<GuardRecord>,
    pub state_version: u64,
}

/// Handler for CV uploads.
pub struct HandleCvHandler {
    pipeline: Arc<GuidancePipeline>,
}

impl HandleCvHandler {
    pub fn new(pipeline: Arc<GuidancePipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn handle(&self, cmd: HandleCvCommand) -> Result<HandleCvResult, HandleMessageError> {
        let cv_text = cmd.cv_text.trim();
        if cv_text.is_empty() {
            return Err(HandleMessageError::InvalidInput(
                "cv_text must not be empty".to_string(),
            ));
        }
        let target_role = cmd
            .target_role
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let request_id = RequestId::new();
        let snapshot = self.pipeline.catalog.current();
        let catalog = &snapshot.index;

        let (mut state, loaded_version) = self.pipeline.load_state(cmd.session_id).await?;
        state.observe_language(Language::detect(cv_text));
        let ids = TurnIds {
            session_id: cmd.session_id,
            request_id,
            language: state.language(),
        };

        let reply = match self
            .pipeline
            .cv_scorer
            .assess(cv_text, target_role, ids.language)
        {
            None => {
                let ask = self.pipeline.builder.domain_ask(&[], ids.language);
                TurnReply {
                    response: StructuredResponse::text(
                        Intent::CvAnalysis,
                        ids.language,
                        ResponseBuilder::ask_preamble(ids.language),
                        ids.session_id,
                        request_id,
                    )
                    .with_ask(ask),
                    verdicts: Vec::new(),
                }
            }
            Some(dashboard) => {
                advance(
                    &mut state,
                    FlowEvent::CvReviewed {
                        role: dashboard.role.clone(),
                        score: dashboard.score.skills,
                    },
                );

                let domain = self
                    .pipeline
                    .taxonomy
                    .role(&dashboard.role)
                    .map(|r| r.domain.clone());
                let missing: Vec<SkillId> = dashboard.missing.iter().map(|g| g.skill.clone()).collect();
                let shown = previously_shown(&state);

                let (cards, verdicts) = if missing.is_empty() {
                    (Vec::new(), Vec::new())
                } else {
                    let query = RetrievalQuery {
                        intent: Intent::CvAnalysis,
                        message: "",
                        domain: domain.as_ref(),
                        skills: &missing,
                        keywords: &[],
                    };
                    let context = GuardContext {
                        domain: domain.as_ref(),
                        skills: &missing,
                        level: None,
                        previously_shown: &shown,
                        wants_more: false,
                    };
                    let outcome = self.pipeline.retrieve_guarded(catalog, &query, &context);
                    let cards = self.pipeline.builder.cards(
                        catalog,
                        &outcome.accepted,
                        domain.as_ref(),
                        ids.language,
                    );
                    (cards, outcome.verdicts)
                };

                let answer = self.pipeline.builder.cv_answer(&dashboard, ids.language);
                TurnReply {
                    response: StructuredResponse::text(
                        Intent::CvAnalysis,
                        ids.language,
                        answer,
                        ids.session_id,
                        request_id,
                    )
                    .with_courses(cards)
                    .with_dashboard(dashboard),
                    verdicts,
                }
            }
        };

        let shown = reply.response.course_ids();
        if !shown.is_empty() {
            state.remember_candidates(&shown);
        }
        let upload_note = ids.language.pick("[CV uploaded]", "[تم رفع السيرة الذاتية]");
        state.finish_turn(upload_note, &reply.response.answer, self.pipeline.history_turns);
        self.pipeline.save_state(&state, loaded_version).await?;

        info!(
            session_id = %ids.session_id,
            request_id = %request_id,
            role = ?reply.response.dashboard.as_ref().map(|d| d.role.to_string()),
            score = ?reply.response.dashboard.as_ref().map(|d| d.score.skills.value()),
            courses = reply.response.courses.len(),
            "cv review complete"
        );

        Ok(HandleCvResult {
            response: reply.response,
            verdicts: reply.verdicts,
            state_version: state.version,
        })
    }
}
