//! Retry/failure coordinator.
//!
//! Every job-level failure — transport error, protocol violation, or
//! remote-reported failure — funnels through [`handle_failure`]. The
//! state mutation (re-queue at the *front* of the queue so transient
//! errors recover before new work starts, or drop permanently) happens
//! atomically in [`crate::state::RunState::fail_in_flight`]; this
//! module reports the outcome.

use veoflow_core::job::JobStatus;
use veoflow_events::{EventBus, ProgressEvent};

pub use crate::state::FailureOutcome;
use crate::state::SharedState;

/// Route one failed in-flight job: re-queue it or finalize it, and
/// publish the matching event.
///
/// The hand-off happens under a single lock acquisition, so the job is
/// never observable in neither collection. Returns `None` when the job
/// is no longer tracked (it completed concurrently).
pub async fn handle_failure(
    state: &SharedState,
    bus: &EventBus,
    job_id: &str,
    reason: &str,
    max_retries: u32,
) -> Option<FailureOutcome> {
    let outcome = state.lock().await.fail_in_flight(job_id, max_retries)?;

    match outcome {
        FailureOutcome::Requeued { attempt } => {
            tracing::warn!(
                job_id,
                attempt,
                max_retries,
                "Job failed, re-queueing: {reason}",
            );
            bus.publish(
                ProgressEvent::new(
                    JobStatus::Retrying,
                    format!("Error: {reason}. Retry attempt {attempt}/{max_retries}"),
                )
                .with_job(job_id.to_string()),
            );
        }
        FailureOutcome::PermanentlyFailed => {
            tracing::error!(job_id, max_retries, "Job permanently failed: {reason}");
            bus.publish(
                ProgressEvent::new(
                    JobStatus::Error,
                    format!("Permanent failure after {max_retries} retries: {reason}"),
                )
                .with_job(job_id.to_string()),
            );
        }
    }

    Some(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
