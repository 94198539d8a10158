//! Foundation module - Shared domain primitives.
//!
//! Identifiers, validation errors, text folding and the state machine
//! trait that the guidance pipeline is built from.

mod errors;
mod ids;
mod language;
mod percentage;
mod state_machine;
pub mod text;

pub use errors::ValidationError;
pub use ids::{RequestId, SessionId};
pub use language::Language;
pub use percentage::Percentage;
pub use state_machine::StateMachine;
