//! Shared run state: the pending queue and the in-flight set.
//!
//! Both manager loops mutate this state, so it lives behind one
//! `tokio::sync::Mutex` and every method performs a complete hand-off:
//! a job id is in at most one of {queue, in-flight set} at any instant,
//! and only this module moves jobs between them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use veoflow_core::job::{Job, OperationHandle};
use veoflow_core::types::JobId;

/// Run state shared by the submission and poll loops.
pub type SharedState = Arc<Mutex<RunState>>;

/// Snapshot handed to the submission loop for one attempt.
///
/// The job itself stays in the in-flight set while the submission call
/// runs; the ticket carries just what the wire call needs.
#[derive(Debug)]
pub struct SubmissionTicket {
    pub job_id: JobId,
    pub prompt_text: String,
}

/// Outcome of a failure hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Budget remained; the job went back to the queue front.
    Requeued { attempt: u32 },
    /// Budget exhausted; the job was dropped and reported as failed.
    PermanentlyFailed,
}

/// The pending queue and in-flight set for one automation run.
#[derive(Debug, Default)]
pub struct RunState {
    queue: VecDeque<Job>,
    in_flight: HashMap<JobId, Job>,
}

impl RunState {
    /// Seed the queue with jobs, preserving caller order.
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            queue: jobs.into(),
            in_flight: HashMap::new(),
        }
    }

    /// Wrap a freshly seeded state for sharing between the loops.
    pub fn shared(jobs: Vec<Job>) -> SharedState {
        Arc::new(Mutex::new(Self::new(jobs)))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether both collections are empty: nothing left to do.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    /// Whether a job id currently sits in the queue.
    pub fn is_queued(&self, job_id: &str) -> bool {
        self.queue.iter().any(|job| job.id == job_id)
    }

    /// Whether a job id currently sits in the in-flight set.
    pub fn is_in_flight(&self, job_id: &str) -> bool {
        self.in_flight.contains_key(job_id)
    }

    /// Move the next queued job into the in-flight set, if capacity
    /// allows.
    ///
    /// Returns `None` when the queue is empty or the in-flight set
    /// already holds `max_concurrent` jobs. The moved job is marked
    /// `Submitting` atomically with the hand-off.
    pub fn pop_for_submission(&mut self, max_concurrent: usize) -> Option<SubmissionTicket> {
        if self.in_flight.len() >= max_concurrent {
            return None;
        }
        let mut job = self.queue.pop_front()?;
        job.begin_submission();

        let ticket = SubmissionTicket {
            job_id: job.id.clone(),
            prompt_text: job.prompt_text.clone(),
        };
        self.in_flight.insert(job.id.clone(), job);
        Some(ticket)
    }

    /// Record the operation handle for a submitted job and mark it
    /// processing.
    ///
    /// Returns `false` when the job is no longer in flight (it failed
    /// concurrently and was removed).
    pub fn attach_handle(&mut self, job_id: &str, handle: OperationHandle) -> bool {
        match self.in_flight.get_mut(job_id) {
            Some(job) => {
                job.begin_processing(handle);
                true
            }
            None => false,
        }
    }

    /// Mark an in-flight job successful, record its artifact URL, and
    /// remove it from tracking.
    pub fn complete_success(&mut self, job_id: &str, video_url: &str) -> Option<Job> {
        let mut job = self.in_flight.remove(job_id)?;
        job.succeed(video_url);
        Some(job)
    }

    /// Route a failed in-flight job in one mutation: count the attempt
    /// and either re-insert it at the front of the queue (so it runs
    /// before newly queued work) or drop it permanently.
    ///
    /// The whole hand-off happens under one lock acquisition, so no
    /// observer can see the job id in neither collection and conclude
    /// the run has drained while a retryable job still exists.
    ///
    /// Returns `None` when the job is not in flight.
    pub fn fail_in_flight(&mut self, job_id: &str, max_retries: u32) -> Option<FailureOutcome> {
        let mut job = self.in_flight.remove(job_id)?;
        if job.retry_count < max_retries {
            job.mark_retrying();
            let attempt = job.retry_count;
            job.requeue();
            self.queue.push_front(job);
            Some(FailureOutcome::Requeued { attempt })
        } else {
            job.fail_permanently();
            Some(FailureOutcome::PermanentlyFailed)
        }
    }

    /// Snapshot of all jobs currently processing, with their handles.
    ///
    /// Jobs still mid-submission (no handle yet) are skipped; they will
    /// be picked up on a later sweep.
    pub fn processing_jobs(&self) -> Vec<(JobId, OperationHandle)> {
        self.in_flight
            .values()
            .filter_map(|job| {
                job.handle
                    .as_ref()
                    .map(|handle| (job.id.clone(), handle.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
