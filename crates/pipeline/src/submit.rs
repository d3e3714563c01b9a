//! Job submission manager.
//!
//! Drains the queue into the in-flight set, never exceeding the
//! concurrency bound, and converts each popped job into a remote
//! operation handle. Failures (transport, protocol) go straight to the
//! retry coordinator. Cancellation is checked at the top of every
//! iteration only, so a submission call already in flight always
//! completes.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use veoflow_core::generation::AspectRatio;
use veoflow_core::job::JobStatus;
use veoflow_core::limits::AutomationLimits;
use veoflow_events::{EventBus, ProgressEvent};
use veoflow_labs::SessionContext;

use crate::backend::GenerationBackend;
use crate::retry::handle_failure;
use crate::state::SharedState;

/// Drive submissions until the run drains or is cancelled.
///
/// The loop keeps running while *anything* is still tracked — not just
/// while the queue is non-empty — because an in-flight job can fail
/// back into the queue from the poll loop at any time.
pub async fn submission_loop<B: GenerationBackend + ?Sized>(
    state: &SharedState,
    backend: &B,
    session: &SessionContext,
    model_key: &str,
    aspect_ratio: AspectRatio,
    limits: &AutomationLimits,
    bus: &EventBus,
    cancel: &CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            tracing::info!("Submission loop cancelled");
            return;
        }

        let ticket = {
            let mut run = state.lock().await;
            if run.is_drained() {
                return;
            }
            run.pop_for_submission(limits.max_concurrent_sessions)
        };

        let Some(ticket) = ticket else {
            // At capacity, or the queue is momentarily empty while
            // in-flight jobs may still fail back into it.
            idle(cancel, limits.submit_backoff).await;
            continue;
        };

        tracing::debug!(job_id = %ticket.job_id, "Submitting prompt");
        bus.publish(
            ProgressEvent::new(JobStatus::Submitting, "Submitting prompt")
                .with_job(ticket.job_id.clone()),
        );

        let result = backend
            .submit(
                &session.project_id,
                &ticket.prompt_text,
                model_key,
                aspect_ratio,
            )
            .await;

        match result {
            Ok(handle) => {
                let attached = state.lock().await.attach_handle(&ticket.job_id, handle.clone());
                if attached {
                    tracing::info!(
                        job_id = %ticket.job_id,
                        operation = %handle.name,
                        "Submission accepted",
                    );
                    bus.publish(
                        ProgressEvent::new(
                            JobStatus::Processing,
                            "Operation handle received; generation in progress",
                        )
                        .with_job(ticket.job_id.clone())
                        .with_operation(handle),
                    );
                } else {
                    tracing::warn!(
                        job_id = %ticket.job_id,
                        "Submitted job is no longer tracked; dropping handle",
                    );
                }
            }
            Err(e) => {
                handle_failure(state, bus, &ticket.job_id, &e.to_string(), limits.max_retries)
                    .await;
            }
        }
    }
}

/// Sleep, waking early if the run is cancelled.
async fn idle(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}
