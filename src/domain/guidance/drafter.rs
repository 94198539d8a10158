//! Answer drafting from a grounding context.
//!
//! The model only ever sees the guarded course cards for the turn. Whatever
//! it writes is checked again by the consistency pass before it reaches the
//! user.

use std::sync::Arc;
use std::time::Duration;

use super::consistency::{CITE_CLOSE, CITE_OPEN};
use super::intent::Intent;
use super::response::CourseCard;
use crate::domain::foundation::{Language, RequestId, SessionId};
use crate::ports::{AIError, AIProvider, CompletionRequest, FinishReason, MessageRole, RequestMetadata, RequestPurpose};

#[derive(Debug, Clone, thiserror::Error)]
pub enum DraftError {
    #[error("drafting unavailable: {0}")]
    Upstream(#[from] AIError),

    /// The provider stopped on its content filter; the text is not used.
    #[error("draft withheld by provider content filter")]
    Filtered,
}

#[derive(Debug, Clone)]
pub struct DraftSettings {
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Inputs for one draft.
pub struct DraftContext<'a> {
    pub message: &'a str,
    pub intent: Intent,
    pub language: Language,
    pub courses: &'a [CourseCard],
    /// Extra grounded text the answer may use (a track roadmap).
    pub notes: Option<&'a str>,
    pub session_id: SessionId,
    pub request_id: RequestId,
}

pub struct AnswerDrafter {
    ai: Arc<dyn AIProvider>,
    settings: DraftSettings,
}

impl AnswerDrafter {
    pub fn new(ai: Arc<dyn AIProvider>, settings: DraftSettings) -> Self {
        Self { ai, settings }
    }

    /// Returns the drafted text, trimmed. May be empty.
    pub async fn draft(&self, context: &DraftContext<'_>) -> Result<String, DraftError> {
        let metadata = RequestMetadata::new(context.session_id, context.request_id, RequestPurpose::Drafting);
        let request = CompletionRequest::new(metadata)
            .with_system_prompt(system_prompt(context.language))
            .with_message(MessageRole::User, grounding_message(context))
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let response = tokio::time::timeout(self.settings.timeout, self.ai.complete(request))
            .await
            .map_err(|_| AIError::Timeout {
                timeout_secs: self.settings.timeout.as_secs(),
            })??;

        if response.finish_reason == FinishReason::ContentFilter {
            return Err(DraftError::Filtered);
        }
        Ok(response.content.trim().to_string())
    }
}

fn system_prompt(language: Language) -> String {
    let reply_in = match language {
        Language::Ar => "Arabic",
        Language::En => "English",
    };
    format!(
        "You are a career-guidance assistant for an online course catalog. \
         Write a short, friendly answer in {reply_in}. \
         Mention only the courses listed in the context, using their exact titles. \
         Wrap every course title you mention in {CITE_OPEN} and {CITE_CLOSE}, \
         for example {CITE_OPEN}SQL Basics{CITE_CLOSE}. \
         Do not invent courses, skills, prices or links. \
         If the context lists no courses, say so and suggest broadening the request."
    )
}

fn grounding_message(context: &DraftContext<'_>) -> String {
    let mut text = format!("Intent: {}\nUser message: {}\n\nCourses:\n", context.intent, context.message);
    if context.courses.is_empty() {
        text.push_str("(none)\n");
    }
    for (rank, card) in context.courses.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} | {} | {} | {}\n",
            rank + 1,
            card.title,
            card.category,
            card.level,
            card.reason
        ));
    }
    if let Some(notes) = context.notes {
        text.push_str("\nNotes:\n");
        text.push_str(notes);
        text.push('\n');
    }
    text
}
