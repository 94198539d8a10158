//! Per-session conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::flow::{transition, Flow, FlowError, FlowEvent, FlowKind};
use super::slots::{SlotUpdate, Slots};
use crate::domain::catalog::CourseId;
use crate::domain::foundation::{Language, SessionId};

/// Who said a history line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// A course shown in the previous turn, with its rank (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShownCandidate {
    pub id: CourseId,
    pub rank: u32,
}

/// Everything the pipeline remembers about a session between turns.
///
/// A turn works on a clone and the store only sees it once the response
/// is complete. `version` increases by one per committed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: SessionId,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub last_candidates: Vec<ShownCandidate>,
    /// Flow the last candidate set was shown in.
    #[serde(default)]
    pub last_candidates_flow: FlowKind,
    #[serde(default)]
    pub turn: u32,
    /// Sticky once detected.
    pub language: Option<Language>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh state for a session's first message.
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            flow: Flow::None,
            slots: Slots::default(),
            last_candidates: Vec::new(),
            last_candidates_flow: FlowKind::None,
            turn: 0,
            language: None,
            history: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Session language, defaulting to English until one is detected.
    pub fn language(&self) -> Language {
        self.language.unwrap_or_default()
    }

    /// Records a detected language unless one is already set.
    pub fn observe_language(&mut self, detected: Option<Language>) {
        if self.language.is_none() {
            self.language = detected;
        }
    }

    pub fn apply_slots(&mut self, update: &SlotUpdate) -> bool {
        self.slots.apply(update)
    }

    /// Moves the flow. Slots are left alone.
    pub fn apply_event(&mut self, event: FlowEvent) -> Result<(), FlowError> {
        self.flow = transition(&self.flow, event)?;
        Ok(())
    }

    /// Remembers the courses shown this turn.
    pub fn remember_candidates(&mut self, ids: &[CourseId]) {
        self.last_candidates = ids
            .iter()
            .enumerate()
            .map(|(i, id)| ShownCandidate {
                id: id.clone(),
                rank: i as u32 + 1,
            })
            .collect();
        self.last_candidates_flow = self.flow.kind();
    }

    pub fn last_candidate_ids(&self) -> Vec<CourseId> {
        self.last_candidates.iter().map(|c| c.id.clone()).collect()
    }

    /// The most recent `turns` exchanges, oldest first.
    pub fn recent_history(&self, turns: usize) -> &[HistoryEntry] {
        let keep = (turns * 2).min(self.history.len());
        &self.history[self.history.len() - keep..]
    }

    /// Closes a turn: appends the exchange, trims history, bumps counters.
    pub fn finish_turn(&mut self, user_text: &str, answer: &str, history_turns: usize) {
        self.history.push(HistoryEntry {
            speaker: Speaker::User,
            text: user_text.to_string(),
        });
        self.history.push(HistoryEntry {
            speaker: Speaker::Assistant,
            text: answer.to_string(),
        });
        let cap = history_turns * 2;
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
        self.turn += 1;
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::PlanSlot;

    #[test]
    fn new_state_starts_empty() {
        let state = ConversationState::new(SessionId::new());
        assert_eq!(state.flow, Flow::None);
        assert_eq!(state.turn, 0);
        assert_eq!(state.version, 0);
        assert!(state.language.is_none());
        assert_eq!(state.language(), Language::En);
    }

    #[test]
    fn language_is_sticky() {
        let mut state = ConversationState::new(SessionId::new());
        state.observe_language(None);
        assert!(state.language.is_none());
        state.observe_language(Some(Language::Ar));
        state.observe_language(Some(Language::En));
        assert_eq!(state.language, Some(Language::Ar));
    }

    #[test]
    fn history_is_capped_to_recent_turns() {
        let mut state = ConversationState::new(SessionId::new());
        for i in 0..5 {
            state.finish_turn(&format!("q{}", i), &format!("a{}", i), 2);
        }
        assert_eq!(state.history.len(), 4);
        assert_eq!(state.history[0].text, "q3");
        assert_eq!(state.turn, 5);
        assert_eq!(state.version, 5);
        assert_eq!(state.recent_history(1).len(), 2);
        assert_eq!(state.recent_history(1)[0].text, "q4");
    }

    #[test]
    fn remembered_candidates_carry_rank_and_flow() {
        let mut state = ConversationState::new(SessionId::new());
        state
            .apply_event(FlowEvent::PlanSlotRequested(PlanSlot::Duration))
            .unwrap();
        let ids = vec![CourseId::new("c1").unwrap(), CourseId::new("c2").unwrap()];
        state.remember_candidates(&ids);

        assert_eq!(state.last_candidates[1].rank, 2);
        assert_eq!(state.last_candidates_flow, FlowKind::PlanBuilding);
        assert_eq!(state.last_candidate_ids(), ids);
    }

    #[test]
    fn state_round_trips_through_yaml() {
        let mut state = ConversationState::new(SessionId::new());
        state.observe_language(Some(Language::Ar));
        state.finish_turn("hi", "hello", 6);
        let yaml = serde_yaml::to_string(&state).unwrap();
        let back: ConversationState = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, state);
    }
}
