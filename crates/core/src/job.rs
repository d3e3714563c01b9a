//! Job lifecycle types: the status state machine and the remote
//! operation handle.
//!
//! A [`Job`] is one prompt's journey through submission, remote
//! processing, and a terminal outcome. Statuses form a closed state
//! machine; see [`JobStatus::can_transition_to`].

use serde::{Deserialize, Serialize};

use crate::types::JobId;

// ---------------------------------------------------------------------------
// OperationHandle
// ---------------------------------------------------------------------------

/// Opaque pair of identifiers the remote platform uses to locate an
/// in-progress generation task.
///
/// Issued by the submission call and required verbatim by every
/// subsequent status check for that job. A handle belongs to exactly one
/// submission attempt: retried jobs are issued a fresh handle, and a
/// handle is never shared between jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Server-assigned asynchronous operation name.
    pub name: String,
    /// Scene id echoed back by the server for this operation.
    pub scene_id: String,
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Closed set of states a job moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the queue, not yet submitted.
    Queued,
    /// Popped from the queue; the submission call is in flight.
    Submitting,
    /// Submitted; the remote operation is running and being polled.
    Processing,
    /// Failed but retry budget remains; about to be re-queued.
    Retrying,
    /// Terminal: generation finished and an artifact URL was extracted.
    Success,
    /// Terminal: permanent failure, retries exhausted or fatal error.
    Error,
}

impl JobStatus {
    /// String representation used in progress events.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Submitting => "submitting",
            JobStatus::Processing => "processing",
            JobStatus::Retrying => "retrying",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }

    /// Whether this status is terminal (no further transitions occur).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Whether a transition from `self` to `next` is part of the state
    /// machine.
    ///
    /// ```text
    /// Queued -> Submitting -> Processing -> Success
    ///              |              |
    ///              v              v
    ///          Retrying/Error  Retrying/Error
    ///              |
    ///              v
    ///           Queued
    /// ```
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Submitting)
                | (Submitting, Processing)
                | (Submitting, Retrying)
                | (Submitting, Error)
                | (Processing, Success)
                | (Processing, Retrying)
                | (Processing, Error)
                | (Retrying, Queued)
        )
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One prompt's lifecycle through the automation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Stable id, derived from the input prompt; never changes across
    /// retries.
    pub id: JobId,
    /// The prompt text submitted to the generation service.
    pub prompt_text: String,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    /// Current position in the state machine.
    pub status: JobStatus,
    /// Handle of the current remote operation, present only while
    /// processing. Cleared on retry so a stale handle is never polled.
    pub handle: Option<OperationHandle>,
    /// Artifact URL, present once the job reached [`JobStatus::Success`].
    pub video_url: Option<String>,
}

impl Job {
    /// Create a queued job for a prompt.
    pub fn new(id: impl Into<JobId>, prompt_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_text: prompt_text.into(),
            retry_count: 0,
            status: JobStatus::Queued,
            handle: None,
            video_url: None,
        }
    }

    /// Move to [`JobStatus::Submitting`].
    pub fn begin_submission(&mut self) {
        self.advance(JobStatus::Submitting);
    }

    /// Record the remote operation handle and move to
    /// [`JobStatus::Processing`].
    pub fn begin_processing(&mut self, handle: OperationHandle) {
        self.handle = Some(handle);
        self.advance(JobStatus::Processing);
    }

    /// Record the artifact URL and move to the terminal
    /// [`JobStatus::Success`] state.
    pub fn succeed(&mut self, video_url: impl Into<String>) {
        self.video_url = Some(video_url.into());
        self.advance(JobStatus::Success);
    }

    /// Move to the terminal [`JobStatus::Error`] state.
    pub fn fail_permanently(&mut self) {
        self.advance(JobStatus::Error);
    }

    /// Count one failed attempt, drop the stale handle, and move to
    /// [`JobStatus::Retrying`].
    pub fn mark_retrying(&mut self) {
        self.retry_count += 1;
        self.handle = None;
        self.advance(JobStatus::Retrying);
    }

    /// Move a retrying job back to [`JobStatus::Queued`].
    pub fn requeue(&mut self) {
        self.advance(JobStatus::Queued);
    }

    fn advance(&mut self, next: JobStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid job transition {:?} -> {:?}",
            self.status,
            next,
        );
        self.status = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
