//! Client-side orchestration for the Gerber-to-PNG conversion service.
//!
//! The [`application::orchestrator::Orchestrator`] owns the user's choices
//! and a single conversion job; adapters in [`infra`] talk to the service
//! and persist preferences.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
