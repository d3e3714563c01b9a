//! Headless automation worker.
//!
//! Reads prompts from a file, resolves a Labs session credential, runs
//! the generation pipeline, and mirrors every progress event to the
//! log. With `VEOFLOW_SAVE_DIR` set, finished videos are downloaded as
//! they complete. Ctrl-C stops the run cooperatively.

mod config;
mod download;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veoflow_core::job::JobStatus;
use veoflow_events::{EventBus, ProgressEvent};
use veoflow_labs::{CredentialStore, SessionCredential};
use veoflow_pipeline::{AutomationRequest, AutomationRunner, PromptInput};

use crate::config::{CredentialSource, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "veoflow_worker=debug,veoflow_pipeline=debug,veoflow_labs=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    let prompts = load_prompts(&config.prompts_file).await?;
    tracing::info!(
        prompts = prompts.len(),
        model = %config.model,
        aspect_ratio = ?config.aspect_ratio,
        "Worker starting",
    );

    let credential = resolve_credential(&config).await?;
    tracing::info!(credential = %credential.name, "Using session credential");

    let request = AutomationRequest {
        prompts: prompts
            .iter()
            .enumerate()
            .map(|(i, text)| PromptInput {
                id: format!("prompt-{}", i + 1),
                text: text.clone(),
            })
            .collect(),
        model: config.model.clone(),
        aspect_ratio: config.aspect_ratio,
    };

    let bus = Arc::new(EventBus::default());
    let runner = AutomationRunner::new(Arc::clone(&bus), config.limits.clone());
    let observer = tokio::spawn(observe_events(
        bus.subscribe(),
        prompts,
        config.save_dir.clone(),
    ));

    // Scoped so the run future releases its borrow of the runner
    // before the senders are dropped below.
    let result = {
        let run = runner.run(request, credential);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, stopping run");
                runner.stop();
                run.await
            }
        }
    };
    result?;

    // Dropping the last senders closes the observer's channel.
    drop(runner);
    drop(bus);
    observer.await.context("event observer panicked")?;

    Ok(())
}

/// Read the prompts file: one prompt per line, blank lines skipped.
async fn load_prompts(path: &PathBuf) -> anyhow::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read prompts file {}", path.display()))?;
    let prompts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if prompts.is_empty() {
        anyhow::bail!("prompts file {} contains no prompts", path.display());
    }
    Ok(prompts)
}

async fn resolve_credential(config: &WorkerConfig) -> anyhow::Result<SessionCredential> {
    match &config.credential_source {
        CredentialSource::Store {
            endpoint,
            auth_token,
        } => {
            let store = CredentialStore::new(endpoint, auth_token, config.limits.request_timeout)?;
            Ok(store.fetch_active().await?)
        }
        CredentialSource::Direct {
            cookie,
            bearer_token,
        } => Ok(SessionCredential {
            id: "env".to_string(),
            name: "environment".to_string(),
            cookie_value: cookie.clone(),
            bearer_token: bearer_token.clone(),
        }),
    }
}

/// Mirror every pipeline event to the log and download finished videos.
async fn observe_events(
    mut rx: broadcast::Receiver<ProgressEvent>,
    prompts: Vec<String>,
    save_dir: Option<PathBuf>,
) {
    let client = reqwest::Client::new();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Event observer lagged behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        match event.job_id.as_deref() {
            Some(job_id) => match event.status {
                JobStatus::Error => tracing::error!(job_id, "{}", event.message),
                JobStatus::Retrying => tracing::warn!(job_id, "{}", event.message),
                _ => tracing::info!(job_id, status = event.status.as_str(), "{}", event.message),
            },
            None => tracing::info!(status = event.status.as_str(), "{}", event.message),
        }

        if event.status != JobStatus::Success {
            continue;
        }
        let (Some(job_id), Some(url), Some(dir)) =
            (event.job_id.as_deref(), event.video_url.as_deref(), save_dir.as_deref())
        else {
            continue;
        };
        let Some(index) = prompt_index(job_id, prompts.len()) else {
            continue;
        };
        if let Err(e) = download::download_artifact(&client, url, dir, index, &prompts[index]).await
        {
            tracing::error!(job_id, "Artifact download failed: {e:#}");
        }
    }
}

/// Recover the zero-based prompt index from a `prompt-{n}` job id.
fn prompt_index(job_id: &str, prompt_count: usize) -> Option<usize> {
    let n: usize = job_id.strip_prefix("prompt-")?.parse().ok()?;
    (1..=prompt_count).contains(&n).then(|| n - 1)
}
