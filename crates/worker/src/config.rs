//! Environment-driven worker configuration.
//!
//! Everything is read once at startup from `VEOFLOW_*` variables (a
//! `.env` file is honored). The credential either comes straight from
//! the environment or is fetched from a credential-store endpoint.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use veoflow_core::generation::{AspectRatio, DEFAULT_MODEL_KEY};
use veoflow_core::limits::AutomationLimits;

/// Where the Labs session credential comes from.
pub enum CredentialSource {
    /// Fetch the active credential from a remote store.
    Store { endpoint: String, auth_token: String },
    /// Cookie (and optional bearer token) supplied directly.
    Direct {
        cookie: String,
        bearer_token: Option<String>,
    },
}

/// Fully resolved worker configuration.
pub struct WorkerConfig {
    pub credential_source: CredentialSource,
    /// File with one prompt per line; blank lines are skipped.
    pub prompts_file: PathBuf,
    pub model: String,
    pub aspect_ratio: AspectRatio,
    /// When set, successful artifacts are downloaded into this directory.
    pub save_dir: Option<PathBuf>,
    pub limits: AutomationLimits,
}

impl WorkerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let prompts_file = PathBuf::from(
            required("VEOFLOW_PROMPTS_FILE").context("no prompts file configured")?,
        );

        let model = optional("VEOFLOW_MODEL").unwrap_or_else(|| DEFAULT_MODEL_KEY.to_string());
        let aspect_ratio = match optional("VEOFLOW_ASPECT_RATIO") {
            Some(raw) => AspectRatio::parse(&raw)?,
            None => AspectRatio::Landscape,
        };

        let save_dir = optional("VEOFLOW_SAVE_DIR").map(PathBuf::from);

        let mut limits = AutomationLimits::default();
        if let Some(raw) = optional("VEOFLOW_MAX_CONCURRENT_SESSIONS") {
            limits.max_concurrent_sessions = raw
                .parse()
                .context("VEOFLOW_MAX_CONCURRENT_SESSIONS must be an integer")?;
        }
        if let Some(raw) = optional("VEOFLOW_MAX_RETRIES") {
            limits.max_retries = raw.parse().context("VEOFLOW_MAX_RETRIES must be an integer")?;
        }
        if let Some(raw) = optional("VEOFLOW_POLL_INTERVAL_SECS") {
            limits.poll_interval = Duration::from_secs(
                raw.parse()
                    .context("VEOFLOW_POLL_INTERVAL_SECS must be an integer")?,
            );
        }

        Ok(Self {
            credential_source: credential_source_from_env()?,
            prompts_file,
            model,
            aspect_ratio,
            save_dir,
            limits,
        })
    }
}

fn credential_source_from_env() -> anyhow::Result<CredentialSource> {
    if let Some(endpoint) = optional("VEOFLOW_CREDENTIAL_ENDPOINT") {
        let auth_token = required("VEOFLOW_AUTH_TOKEN")
            .context("VEOFLOW_CREDENTIAL_ENDPOINT is set but VEOFLOW_AUTH_TOKEN is not")?;
        return Ok(CredentialSource::Store {
            endpoint,
            auth_token,
        });
    }

    let cookie = match optional("VEOFLOW_COOKIE") {
        Some(cookie) => cookie,
        None => match optional("VEOFLOW_COOKIE_FILE") {
            Some(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read cookie file {path}"))?
                .trim()
                .to_string(),
            None => bail!(
                "no credential configured: set VEOFLOW_CREDENTIAL_ENDPOINT, \
                 VEOFLOW_COOKIE, or VEOFLOW_COOKIE_FILE"
            ),
        },
    };

    Ok(CredentialSource::Direct {
        cookie,
        bearer_token: optional("VEOFLOW_BEARER_TOKEN"),
    })
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("environment variable {key} is not set"))
}

/// An unset or empty variable counts as absent.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
