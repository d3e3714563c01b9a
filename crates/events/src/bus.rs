//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fire-and-forget hub the pipeline uses to report
//! every job state transition. Subscribers (a UI, the worker binary, a
//! test harness) receive every published [`ProgressEvent`]; the pipeline
//! never waits on them and expects no acknowledgement.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use veoflow_core::job::{JobStatus, OperationHandle};
use veoflow_core::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// One observable state transition in an automation run.
///
/// `job_id` is `None` exactly once per successful run: the distinguished
/// "all jobs processed" event emitted after the queue and in-flight set
/// drain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The job this event concerns, or `None` for run-level events.
    pub job_id: Option<JobId>,

    /// Status the job transitioned to (or holds, for poll progress).
    pub status: JobStatus,

    /// Human-readable description of what happened.
    pub message: String,

    /// Artifact URL, present on terminal success events.
    pub video_url: Option<String>,

    /// Remote operation handle, when one is associated with the event.
    pub operation: Option<OperationHandle>,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl ProgressEvent {
    /// Create a run-level event with no job attached.
    pub fn new(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            job_id: None,
            status,
            message: message.into(),
            video_url: None,
            operation: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the job this event concerns.
    pub fn with_job(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Attach the artifact URL (terminal success events).
    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    /// Attach the remote operation handle.
    pub fn with_operation(mut self, handle: OperationHandle) -> Self {
        self.operation = Some(handle);
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`ProgressEvent`]s.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently observe every event of a run.
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero subscribers the event is silently dropped; emission is
    /// one-way and never applies backpressure to the pipeline.
    pub fn publish(&self, event: ProgressEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
