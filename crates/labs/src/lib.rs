//! HTTP surface of the Labs video-generation platform.
//!
//! Replays the calls a browser session would make: credential exchange,
//! project creation and activation ([`session`]), and the asynchronous
//! video-generation protocol ([`api`]). All requests go through the
//! authenticated [`gateway::LabsGateway`].

pub mod api;
pub mod credential;
pub mod gateway;
pub mod session;

pub use api::{GenerationStatus, VideoApi};
pub use credential::{CredentialStore, SessionCredential};
pub use gateway::{GatewayError, LabsGateway};
pub use session::SessionContext;

/// Errors produced by the Labs protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum LabsError {
    /// Transport or HTTP-level failure from the gateway.
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),

    /// Credential rejected, absent, or session establishment failed.
    /// Fatal for the whole run; never retried per job.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote answered successfully but the response is missing
    /// expected fields. Treated as a retryable job-level failure since
    /// it may be a transient malformed response.
    #[error("Protocol violation: {0}")]
    Protocol(String),
}
