//! Status poll manager.
//!
//! Sweeps the in-flight set on a fixed interval, issuing one status
//! check per processing job per sweep, and classifies each answer into
//! success, failure, or still-processing. Runs until everything drains
//! (emitting the distinguished run-completion event exactly once) or
//! the run is cancelled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use veoflow_core::generation::humanize_status;
use veoflow_core::job::JobStatus;
use veoflow_core::limits::AutomationLimits;
use veoflow_events::{EventBus, ProgressEvent};
use veoflow_labs::GenerationStatus;

use crate::backend::GenerationBackend;
use crate::retry::handle_failure;
use crate::state::SharedState;

/// Message of the run-level event published when every job reached a
/// terminal state. Its `job_id` is `None`.
pub const COMPLETION_MESSAGE: &str = "All prompts have been processed";

/// Poll in-flight operations until the run drains or is cancelled.
pub async fn poll_loop<B: GenerationBackend + ?Sized>(
    state: &SharedState,
    backend: &B,
    limits: &AutomationLimits,
    bus: &EventBus,
    cancel: &CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            tracing::info!("Poll loop cancelled");
            return;
        }

        if state.lock().await.is_drained() {
            tracing::info!("All jobs reached a terminal state");
            bus.publish(ProgressEvent::new(JobStatus::Success, COMPLETION_MESSAGE));
            return;
        }

        let processing = state.lock().await.processing_jobs();
        for (job_id, handle) in processing {
            match backend.check(&handle).await {
                Ok(GenerationStatus::Successful { video_url }) => {
                    let job = state.lock().await.complete_success(&job_id, &video_url);
                    if job.is_some() {
                        tracing::info!(job_id = %job_id, video_url = %video_url, "Generation complete");
                        bus.publish(
                            ProgressEvent::new(JobStatus::Success, "Generation complete")
                                .with_job(job_id)
                                .with_video_url(video_url)
                                .with_operation(handle),
                        );
                    }
                }
                Ok(GenerationStatus::Failed { reason }) => {
                    handle_failure(state, bus, &job_id, &reason, limits.max_retries).await;
                }
                Ok(GenerationStatus::Pending { raw_status }) => {
                    bus.publish(
                        ProgressEvent::new(
                            JobStatus::Processing,
                            format!("Status: {}", humanize_status(&raw_status)),
                        )
                        .with_job(job_id)
                        .with_operation(handle),
                    );
                }
                Err(e) => {
                    handle_failure(state, bus, &job_id, &e.to_string(), limits.max_retries).await;
                }
            }
        }

        idle(cancel, limits.poll_interval).await;
    }
}

/// Sleep between sweeps, waking early if the run is cancelled.
async fn idle(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}
