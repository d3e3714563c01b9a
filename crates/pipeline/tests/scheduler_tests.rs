//! End-to-end scheduler tests against an in-memory backend.
//!
//! These drive [`AutomationRunner::run_with_session`] with scripted
//! submit/check behavior per prompt and assert on the resulting event
//! stream and on what the backend observed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::TryRecvError;
use veoflow_core::generation::AspectRatio;
use veoflow_core::job::{JobStatus, OperationHandle};
use veoflow_core::limits::AutomationLimits;
use veoflow_events::{EventBus, ProgressEvent};
use veoflow_labs::{GenerationStatus, LabsError, SessionContext};
use veoflow_pipeline::{AutomationRequest, AutomationRunner, GenerationBackend, PromptInput};

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum CheckStep {
    Pending,
    Successful(String),
    Failed(String),
}

#[derive(Debug, Default)]
struct Script {
    /// Fail this many submit calls with a protocol error before
    /// accepting one.
    submit_failures: u32,
    /// Consumed one per check call; the final step repeats.
    check_steps: VecDeque<CheckStep>,
}

/// In-memory stand-in for the remote generation service.
///
/// Keyed by prompt text: each prompt carries its own script. Handles are
/// numbered so a retried submission is observably distinct from the
/// original.
#[derive(Default)]
struct MockBackend {
    scripts: Mutex<HashMap<String, Script>>,
    /// Prompt text of every submit call, in order, including rejected ones.
    submit_log: Mutex<Vec<String>>,
    /// Handle name -> prompt text for routing check calls.
    handles: Mutex<HashMap<String, String>>,
    handle_counter: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockBackend {
    fn script(&self, prompt: &str, submit_failures: u32, steps: &[CheckStep]) {
        self.scripts.lock().unwrap().insert(
            prompt.to_string(),
            Script {
                submit_failures,
                check_steps: steps.iter().cloned().collect(),
            },
        );
    }

    fn submit_order(&self) -> Vec<String> {
        self.submit_log.lock().unwrap().clone()
    }

    fn issued_handles(&self) -> usize {
        self.handle_counter.load(Ordering::SeqCst)
    }

    fn max_concurrent_observed(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn submit(
        &self,
        _project_id: &str,
        prompt: &str,
        _model_key: &str,
        _aspect_ratio: AspectRatio,
    ) -> Result<OperationHandle, LabsError> {
        self.submit_log.lock().unwrap().push(prompt.to_string());

        {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(prompt.to_string()).or_default();
            if script.submit_failures > 0 {
                script.submit_failures -= 1;
                return Err(LabsError::Protocol("submission rejected".to_string()));
            }
        }

        let n = self.handle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = OperationHandle {
            name: format!("operations/{n}"),
            scene_id: format!("scene-{n}"),
        };
        self.handles
            .lock()
            .unwrap()
            .insert(handle.name.clone(), prompt.to_string());
        self.enter();
        Ok(handle)
    }

    async fn check(&self, handle: &OperationHandle) -> Result<GenerationStatus, LabsError> {
        let prompt = self
            .handles
            .lock()
            .unwrap()
            .get(&handle.name)
            .cloned()
            .ok_or_else(|| LabsError::Protocol("unknown operation".to_string()))?;

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(prompt).or_default();
            if script.check_steps.len() > 1 {
                script.check_steps.pop_front()
            } else {
                script.check_steps.front().cloned()
            }
        };

        match step {
            Some(CheckStep::Pending) | None => Ok(GenerationStatus::Pending {
                raw_status: "MEDIA_GENERATION_STATUS_PENDING".to_string(),
            }),
            Some(CheckStep::Successful(url)) => {
                self.leave();
                Ok(GenerationStatus::Successful { video_url: url })
            }
            Some(CheckStep::Failed(reason)) => {
                self.leave();
                Ok(GenerationStatus::Failed { reason })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn fast_limits(max_concurrent: usize, max_retries: u32) -> AutomationLimits {
    AutomationLimits {
        max_concurrent_sessions: max_concurrent,
        max_retries,
        submit_backoff: Duration::from_millis(5),
        poll_interval: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
    }
}

fn request(prompts: &[(&str, &str)]) -> AutomationRequest {
    AutomationRequest {
        prompts: prompts
            .iter()
            .map(|(id, text)| PromptInput {
                id: (*id).to_string(),
                text: (*text).to_string(),
            })
            .collect(),
        model: "veo_3_0_t2v_fast_ultra".to_string(),
        aspect_ratio: AspectRatio::Landscape,
    }
}

fn session() -> SessionContext {
    SessionContext {
        project_id: "proj-1".to_string(),
        project_name: "Veo Project - test".to_string(),
    }
}

async fn run_to_completion(
    backend: &MockBackend,
    limits: AutomationLimits,
    req: AutomationRequest,
) -> Vec<ProgressEvent> {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let runner = AutomationRunner::new(bus, limits);

    tokio::time::timeout(
        Duration::from_secs(10),
        runner.run_with_session(req, backend, session()),
    )
    .await
    .expect("run should drain");

    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    events
}

fn events_for<'a>(events: &'a [ProgressEvent], job_id: &str) -> Vec<&'a ProgressEvent> {
    events
        .iter()
        .filter(|e| e.job_id.as_deref() == Some(job_id))
        .collect()
}

fn completion_events(events: &[ProgressEvent]) -> Vec<&ProgressEvent> {
    events.iter().filter(|e| e.job_id.is_none()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_respects_concurrency_bound() {
    let backend = MockBackend::default();
    backend.script(
        "first prompt",
        0,
        &[
            CheckStep::Pending,
            CheckStep::Successful("https://cdn.example/1.mp4".into()),
        ],
    );
    backend.script(
        "second prompt",
        0,
        &[CheckStep::Successful("https://cdn.example/2.mp4".into())],
    );
    backend.script(
        "third prompt",
        0,
        &[
            CheckStep::Pending,
            CheckStep::Successful("https://cdn.example/3.mp4".into()),
        ],
    );

    let events = run_to_completion(
        &backend,
        fast_limits(2, 3),
        request(&[
            ("p-1", "first prompt"),
            ("p-2", "second prompt"),
            ("p-3", "third prompt"),
        ]),
    )
    .await;

    assert!(backend.max_concurrent_observed() <= 2);

    for (job_id, url) in [
        ("p-1", "https://cdn.example/1.mp4"),
        ("p-2", "https://cdn.example/2.mp4"),
        ("p-3", "https://cdn.example/3.mp4"),
    ] {
        let success: Vec<_> = events_for(&events, job_id)
            .into_iter()
            .filter(|e| e.status == JobStatus::Success)
            .collect();
        assert_eq!(success.len(), 1, "one success event for {job_id}");
        // Artifact URL is passed through untouched.
        assert_eq!(success[0].video_url.as_deref(), Some(url));
        assert!(success[0].operation.is_some());
    }

    let completions = completion_events(&events);
    assert_eq!(completions.len(), 1, "exactly one run-level completion");
    assert_eq!(completions[0].status, JobStatus::Success);
}

#[tokio::test]
async fn submit_failure_retries_then_succeeds() {
    let backend = MockBackend::default();
    backend.script(
        "flaky prompt",
        1,
        &[CheckStep::Successful("https://cdn.example/v.mp4".into())],
    );

    let events = run_to_completion(
        &backend,
        fast_limits(5, 3),
        request(&[("p-1", "flaky prompt")]),
    )
    .await;

    assert_eq!(backend.submit_order(), vec!["flaky prompt", "flaky prompt"]);

    let job_events = events_for(&events, "p-1");
    let retrying: Vec<_> = job_events
        .iter()
        .filter(|e| e.status == JobStatus::Retrying)
        .collect();
    assert_eq!(retrying.len(), 1);
    assert!(retrying[0].message.contains("1/3"));
    assert!(job_events.iter().any(|e| e.status == JobStatus::Success));
    assert_eq!(completion_events(&events).len(), 1);
}

#[tokio::test]
async fn reported_failure_requeues_with_fresh_handle() {
    let backend = MockBackend::default();
    backend.script(
        "quota prompt",
        0,
        &[
            CheckStep::Failed("quota exceeded".into()),
            CheckStep::Successful("https://cdn.example/v.mp4".into()),
        ],
    );

    let events = run_to_completion(
        &backend,
        fast_limits(5, 3),
        request(&[("p-1", "quota prompt")]),
    )
    .await;

    // Two distinct operations were started for the same prompt.
    assert_eq!(backend.issued_handles(), 2);

    let job_events = events_for(&events, "p-1");
    let retrying: Vec<_> = job_events
        .iter()
        .filter(|e| e.status == JobStatus::Retrying)
        .collect();
    assert_eq!(retrying.len(), 1);
    assert!(retrying[0].message.contains("quota exceeded"));

    let success: Vec<_> = job_events
        .iter()
        .filter(|e| e.status == JobStatus::Success)
        .collect();
    assert_eq!(success.len(), 1);
}

#[tokio::test]
async fn exhausted_retry_budget_reports_permanent_failure() {
    let backend = MockBackend::default();
    backend.script("doomed prompt", u32::MAX, &[]);

    let events = run_to_completion(
        &backend,
        fast_limits(5, 3),
        request(&[("p-1", "doomed prompt")]),
    )
    .await;

    // Initial attempt plus three retries.
    assert_eq!(backend.submit_order().len(), 4);

    let job_events = events_for(&events, "p-1");
    let retrying = job_events
        .iter()
        .filter(|e| e.status == JobStatus::Retrying)
        .count();
    assert_eq!(retrying, 3);

    let errors: Vec<_> = job_events
        .iter()
        .filter(|e| e.status == JobStatus::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Permanent failure"));

    // The run still drains and announces completion.
    assert_eq!(completion_events(&events).len(), 1);
}

#[tokio::test]
async fn failed_job_runs_again_before_queued_work() {
    let backend = MockBackend::default();
    backend.script(
        "prompt a",
        1,
        &[CheckStep::Successful("https://cdn.example/a.mp4".into())],
    );
    backend.script(
        "prompt b",
        0,
        &[CheckStep::Successful("https://cdn.example/b.mp4".into())],
    );

    let events = run_to_completion(
        &backend,
        fast_limits(1, 3),
        request(&[("p-a", "prompt a"), ("p-b", "prompt b")]),
    )
    .await;

    // With concurrency 1, the failed "a" is retried before "b" starts.
    assert_eq!(
        backend.submit_order(),
        vec!["prompt a", "prompt a", "prompt b"]
    );
    assert_eq!(completion_events(&events).len(), 1);
}

#[tokio::test]
async fn stop_halts_the_run_without_completion_event() {
    let backend = Arc::new(MockBackend::default());
    backend.script("stuck prompt", 0, &[CheckStep::Pending]);

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let runner = Arc::new(AutomationRunner::new(bus, fast_limits(5, 3)));

    let task = tokio::spawn({
        let runner = Arc::clone(&runner);
        let backend = Arc::clone(&backend);
        async move {
            runner
                .run_with_session(request(&[("p-1", "stuck prompt")]), &*backend, session())
                .await;
        }
    });

    // Let the job reach the in-flight set, then cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.stop();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("run should stop promptly")
        .expect("run task should not panic");

    let submits_at_stop = backend.submit_order().len();

    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }

    // The unfinished run never announces completion.
    assert!(completion_events(&events).is_empty());
    assert!(!events
        .iter()
        .any(|e| e.job_id.as_deref() == Some("p-1") && e.status == JobStatus::Success));
    assert_eq!(backend.submit_order().len(), submits_at_stop);
}
