//! Seam between the scheduler and the remote generation protocol.
//!
//! The scheduler only needs two operations: submit a prompt and check
//! an operation handle. Hiding them behind a trait keeps the loops
//! testable against an in-memory fake.

use async_trait::async_trait;
use veoflow_core::generation::AspectRatio;
use veoflow_core::job::OperationHandle;
use veoflow_labs::{GenerationStatus, LabsError, VideoApi};

/// Remote generation service as seen by the scheduler.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit one prompt; returns the handle of the started operation.
    async fn submit(
        &self,
        project_id: &str,
        prompt: &str,
        model_key: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<OperationHandle, LabsError>;

    /// Check one in-flight operation.
    async fn check(&self, handle: &OperationHandle) -> Result<GenerationStatus, LabsError>;
}

#[async_trait]
impl GenerationBackend for VideoApi {
    async fn submit(
        &self,
        project_id: &str,
        prompt: &str,
        model_key: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<OperationHandle, LabsError> {
        self.submit_generation(project_id, prompt, model_key, aspect_ratio)
            .await
    }

    async fn check(&self, handle: &OperationHandle) -> Result<GenerationStatus, LabsError> {
        self.check_generation(handle).await
    }
}
