//! Asynchronous video-generation protocol: batch submit and batch
//! status check.
//!
//! Requests are built with [`serde_json::json!`] to mirror the wire
//! shapes exactly; responses are navigated field-by-field so that a
//! missing field surfaces as [`LabsError::Protocol`] instead of a
//! silent success.

use std::sync::Arc;

use rand::Rng;
use veoflow_core::generation::{AspectRatio, STATUS_FAILED, STATUS_SUCCESSFUL, SEED_RANGE, TOOL_NAME};
use veoflow_core::job::OperationHandle;

use crate::gateway::LabsGateway;
use crate::LabsError;

/// Batch text-to-video submission route.
const GENERATE_PATH: &str = "/video:batchAsyncGenerateVideoText";

/// Batch status-check route.
const STATUS_PATH: &str = "/video:batchCheckAsyncVideoGenerationStatus";

/// Prefix of client-generated scene ids, kept from the browser client.
const SCENE_ID_PREFIX: &str = "client-generated-uuid-";

/// Fallback reason when a failed operation carries no error message.
const UNKNOWN_FAILURE_REASON: &str = "Unknown generation failure";

// ---------------------------------------------------------------------------
// GenerationStatus
// ---------------------------------------------------------------------------

/// Classified outcome of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Terminal: the artifact is ready at `video_url`.
    Successful { video_url: String },
    /// Terminal: the remote reported a failure with a reason.
    Failed { reason: String },
    /// Not terminal yet; `raw_status` is the remote's status value.
    Pending { raw_status: String },
}

// ---------------------------------------------------------------------------
// VideoApi
// ---------------------------------------------------------------------------

/// Client for the sandbox video-generation endpoints.
pub struct VideoApi {
    gateway: Arc<LabsGateway>,
}

impl VideoApi {
    pub fn new(gateway: Arc<LabsGateway>) -> Self {
        Self { gateway }
    }

    /// Submit one prompt for asynchronous generation.
    ///
    /// A fresh scene id is generated per call, including for retries of
    /// the same job: the remote treats the scene id as the client-side
    /// identity of the attempt, and reusing one across attempts risks
    /// ambiguous collisions.
    pub async fn submit_generation(
        &self,
        project_id: &str,
        prompt: &str,
        model_key: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<OperationHandle, LabsError> {
        let scene_id = new_scene_id();
        let seed = rand::rng().random_range(0..SEED_RANGE);

        let body = serde_json::json!({
            "clientContext": {
                "projectId": project_id,
                "tool": TOOL_NAME,
            },
            "requests": [{
                "aspectRatio": aspect_ratio.wire_token(),
                "seed": seed,
                "textInput": { "prompt": prompt },
                "videoModelKey": model_key,
                "metadata": { "sceneId": scene_id },
            }]
        });

        let url = format!("{}{}", self.gateway.video_api_base_url(), GENERATE_PATH);
        let response = self.gateway.post_json(&url, &body).await?;
        parse_submit_response(&response)
    }

    /// Check the status of one in-flight operation.
    pub async fn check_generation(
        &self,
        handle: &OperationHandle,
    ) -> Result<GenerationStatus, LabsError> {
        let body = serde_json::json!({
            "operations": [[{
                "operation": { "name": handle.name },
                "sceneId": handle.scene_id,
            }]]
        });

        let url = format!("{}{}", self.gateway.video_api_base_url(), STATUS_PATH);
        let response = self.gateway.post_json(&url, &body).await?;
        classify_status_response(&response)
    }
}

/// Generate a unique client-side scene id for one submission attempt.
pub fn new_scene_id() -> String {
    format!("{SCENE_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extract the operation handle from a submission response.
///
/// Both the operation name and the scene id must be present; the
/// absence of either is a protocol violation for this job, not a
/// success.
pub fn parse_submit_response(value: &serde_json::Value) -> Result<OperationHandle, LabsError> {
    let operation = value.pointer("/operations/0");

    let name = operation
        .and_then(|op| op.pointer("/operation/name"))
        .and_then(serde_json::Value::as_str);
    let scene_id = operation
        .and_then(|op| op.get("sceneId"))
        .and_then(serde_json::Value::as_str);

    match (name, scene_id) {
        (Some(name), Some(scene_id)) => Ok(OperationHandle {
            name: name.to_string(),
            scene_id: scene_id.to_string(),
        }),
        _ => Err(LabsError::Protocol(
            "Generation response is missing operation name or scene id".to_string(),
        )),
    }
}

/// Classify a status-check response into exactly three outcomes.
///
/// The artifact URL is read from `operation.metadata.video.fifeUrl`,
/// falling back to `servingBaseUri`. A "successful" status without any
/// URL is a protocol violation, never a success.
pub fn classify_status_response(value: &serde_json::Value) -> Result<GenerationStatus, LabsError> {
    let operation = value
        .pointer("/operations/0")
        .ok_or_else(|| LabsError::Protocol("Status response has no operations".to_string()))?;

    let raw_status = operation
        .get("status")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| LabsError::Protocol("Status response is missing status".to_string()))?;

    if raw_status == STATUS_SUCCESSFUL {
        let video_url = operation
            .pointer("/operation/metadata/video/fifeUrl")
            .and_then(serde_json::Value::as_str)
            .or_else(|| {
                operation
                    .pointer("/operation/metadata/video/servingBaseUri")
                    .and_then(serde_json::Value::as_str)
            });

        return match video_url {
            Some(url) => Ok(GenerationStatus::Successful {
                video_url: url.to_string(),
            }),
            None => Err(LabsError::Protocol(
                "Successful status without a video URL".to_string(),
            )),
        };
    }

    if raw_status == STATUS_FAILED {
        let reason = operation
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(UNKNOWN_FAILURE_REASON);
        return Ok(GenerationStatus::Failed {
            reason: reason.to_string(),
        });
    }

    Ok(GenerationStatus::Pending {
        raw_status: raw_status.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
