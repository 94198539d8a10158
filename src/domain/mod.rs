//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors, text folding, language)
//! - `catalog` - Course records and the in-memory catalog index
//! - `taxonomy` - Skills, domains, roles and alias resolution
//! - `conversation` - Per-session state, slots and flows
//! - `guidance` - The per-turn retrieval and grounding pipeline stages

pub mod catalog;
pub mod conversation;
pub mod foundation;
pub mod guidance;
pub mod taxonomy;
