//! Core automation scheduler: bounded-concurrency submission, status
//! polling, retry with front re-queueing, and cooperative cancellation.
//!
//! Two loops drive one run. The [`submit::submission_loop`] drains the
//! queue into the in-flight set without exceeding the concurrency
//! bound; the [`poll::poll_loop`] sweeps the in-flight set until every
//! job reaches a terminal outcome. They share a single
//! [`state::RunState`] behind a mutex and report everything through the
//! event bus. [`runner::AutomationRunner`] wires the pieces together.

pub mod backend;
pub mod poll;
pub mod retry;
pub mod runner;
pub mod state;
pub mod submit;

pub use backend::GenerationBackend;
pub use runner::{AutomationRequest, AutomationRunner, PromptInput, RunError};
pub use state::{RunState, SharedState};
