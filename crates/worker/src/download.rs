//! Artifact download with the skip-if-present policy.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rand::distr::Alphanumeric;
use rand::Rng;
use veoflow_core::artifact::{artifact_filename, has_existing_artifact};

/// Download one finished video into `dir`.
///
/// Returns `Ok(None)` when an artifact for this prompt index already
/// exists in the directory; the file on disk wins over a re-download.
pub async fn download_artifact(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    index: usize,
    prompt: &str,
) -> anyhow::Result<Option<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    if has_existing_artifact(existing_names(dir).await?.iter().map(String::as_str), index) {
        tracing::info!(index, "Artifact already saved, skipping download");
        return Ok(None);
    }

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|| format!("artifact download failed for {url}"))?;
    let bytes = response
        .bytes()
        .await
        .context("failed to read artifact body")?;

    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let path = dir.join(artifact_filename(index, prompt, &suffix));

    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), size = bytes.len(), "Artifact saved");
    Ok(Some(path))
}

async fn existing_names(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_artifact_short_circuits() {
        let dir = std::env::temp_dir().join(format!("veoflow-dl-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("1_a_cat_abc123.mp4"), b"stub")
            .await
            .unwrap();

        let client = reqwest::Client::new();
        // The URL is never contacted when the artifact already exists.
        let saved = download_artifact(&client, "http://127.0.0.1:1/x.mp4", &dir, 0, "a cat")
            .await
            .unwrap();
        assert!(saved.is_none());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
