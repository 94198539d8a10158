//! Conversation domain module.
//!
//! Per-session state carried between turns: the active flow, accumulated
//! slots, the last shown candidates and a short history window. The state
//! is an explicit value loaded and saved through the `ConversationStore`
//! port; nothing here is shared between sessions.

mod flow;
mod slots;
mod state;

pub use flow::{
    transition, ChoiceTarget, CvReviewFlow, ExplorationFlow, ExplorationStage, Flow, FlowError,
    FlowEvent, FlowKind, OfferedChoice, PlanBuildingFlow, PlanSlot,
};
pub use slots::{SlotUpdate, Slots};
pub use state::{ConversationState, HistoryEntry, ShownCandidate, Speaker};
