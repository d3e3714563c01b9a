//! Pure domain types and rules for the veoflow automation pipeline.
//!
//! No I/O lives here. Wire calls belong to `veoflow-labs`, scheduling to
//! `veoflow-pipeline`. Keeping this crate dependency-light makes the
//! domain rules (model selection, job state machine, retry limits)
//! trivially unit-testable.

pub mod artifact;
pub mod error;
pub mod generation;
pub mod job;
pub mod limits;
pub mod types;
