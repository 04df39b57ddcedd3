//! Conversion workflow: job state machine, orchestration and result handling.

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod outcome;
pub mod ports;
pub mod preferences;
pub mod presenter;
