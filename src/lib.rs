//! Career Copilot - bilingual career guidance grounded in a course catalog
//!
//! Each chat turn is routed to an intent, resolved against a controlled
//! skill taxonomy, answered from catalog courses that passed a relevance
//! guard, and checked so the answer names nothing outside that set.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
