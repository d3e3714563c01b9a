//! Run orchestration: session bootstrap, queue seeding, and the two
//! concurrent manager loops.
//!
//! [`AutomationRunner`] owns the event bus and the cancellation token
//! for the current run. `stop` cancels cooperatively: both loops finish
//! the call they are in and exit at their next iteration top.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use veoflow_core::error::CoreError;
use veoflow_core::generation::{resolve_model_key, AspectRatio};
use veoflow_core::job::{Job, JobStatus};
use veoflow_core::limits::AutomationLimits;
use veoflow_core::types::JobId;
use veoflow_events::{EventBus, ProgressEvent};
use veoflow_labs::session::bootstrap_session;
use veoflow_labs::{LabsError, LabsGateway, SessionContext, SessionCredential, VideoApi};

use crate::backend::GenerationBackend;
use crate::poll::poll_loop;
use crate::state::RunState;
use crate::submit::submission_loop;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One prompt supplied by the caller.
#[derive(Debug, Clone)]
pub struct PromptInput {
    /// Stable id the caller will see on every event for this prompt.
    pub id: JobId,
    pub text: String,
}

/// Everything needed to start one automation run.
#[derive(Debug, Clone)]
pub struct AutomationRequest {
    pub prompts: Vec<PromptInput>,
    /// Requested model key; portrait runs override it, see
    /// [`resolve_model_key`].
    pub model: String,
    pub aspect_ratio: AspectRatio,
}

/// Errors that abort a run before or during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Labs(#[from] LabsError),

    #[error(transparent)]
    Config(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// AutomationRunner
// ---------------------------------------------------------------------------

/// Entry point for starting and stopping automation runs.
pub struct AutomationRunner {
    bus: Arc<EventBus>,
    limits: AutomationLimits,
    /// Token of the current run; replaced with a fresh one when a run
    /// starts, so a stop request never leaks into the next run.
    cancel: Mutex<CancellationToken>,
}

impl AutomationRunner {
    pub fn new(bus: Arc<EventBus>, limits: AutomationLimits) -> Self {
        Self {
            bus,
            limits,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// The bus all progress events of this runner are published on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Request cooperative cancellation of the current run.
    ///
    /// In-flight remote calls complete; no new submission or poll call
    /// starts once the loops observe the token.
    pub fn stop(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Run the full pipeline against the real Labs backend.
    ///
    /// Establishes the session (fatal on failure: every supplied prompt
    /// is reported as failed and the error is returned), then drives
    /// the submission and poll loops to completion.
    pub async fn run(
        &self,
        request: AutomationRequest,
        credential: SessionCredential,
    ) -> Result<(), RunError> {
        self.limits.validate()?;

        let gateway = Arc::new(
            LabsGateway::new(credential, self.limits.request_timeout).map_err(LabsError::from)?,
        );

        let session = match bootstrap_session(&gateway).await {
            Ok(session) => session,
            Err(e) => {
                report_fatal(&self.bus, &request.prompts, &e.to_string());
                return Err(e.into());
            }
        };

        let api = VideoApi::new(gateway);
        self.run_with_session(request, &api, session).await;
        Ok(())
    }

    /// Drive one run against an already-established session.
    ///
    /// Takes the backend as a parameter so schedulers can be exercised
    /// against a fake without any network.
    pub async fn run_with_session<B: GenerationBackend + ?Sized>(
        &self,
        request: AutomationRequest,
        backend: &B,
        session: SessionContext,
    ) {
        let cancel = self.fresh_token();
        let model_key = resolve_model_key(&request.model, request.aspect_ratio);
        let jobs: Vec<Job> = request
            .prompts
            .into_iter()
            .map(|prompt| Job::new(prompt.id, prompt.text))
            .collect();

        tracing::info!(
            project_id = %session.project_id,
            jobs = jobs.len(),
            model_key = %model_key,
            aspect_ratio = ?request.aspect_ratio,
            "Automation run starting",
        );

        let state = RunState::shared(jobs);
        tokio::join!(
            submission_loop(
                &state,
                backend,
                &session,
                &model_key,
                request.aspect_ratio,
                &self.limits,
                &self.bus,
                &cancel,
            ),
            poll_loop(&state, backend, &self.limits, &self.bus, &cancel),
        );

        tracing::info!("Automation run finished");
    }

    /// Install and return a fresh cancellation token for a new run.
    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }
}

/// Report a fatal, run-level failure against every supplied prompt.
///
/// Fatal errors (credential rejected, session creation failed) are not
/// retryable per job, but no prompt may be dropped silently.
pub fn report_fatal(bus: &EventBus, prompts: &[PromptInput], reason: &str) {
    tracing::error!("Fatal automation error: {reason}");
    for prompt in prompts {
        bus.publish(
            ProgressEvent::new(JobStatus::Error, format!("Fatal error: {reason}"))
                .with_job(prompt.id.clone()),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
