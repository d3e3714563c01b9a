//! Session bootstrapper: exchange a credential for a project-scoped
//! session context.
//!
//! One bootstrap happens per automation run: create a fresh Labs
//! project, fire the best-effort activation call, and wait a short fixed
//! delay the remote system needs before the new project is usable by
//! generation calls. Any failure here is fatal for the run.

use std::time::Duration;

use veoflow_core::generation::TOOL_NAME;

use crate::gateway::LabsGateway;
use crate::LabsError;

/// tRPC route that creates a project.
const CREATE_PROJECT_PATH: &str = "/fx/api/trpc/project.createProject";

/// Build id segment of the next-data activation route.
const NEXT_DATA_ID: &str = "F62GRMHSULGakdozzVitoIs";

/// Delay after activation before the project is reliably usable.
pub const ACTIVATION_DELAY: Duration = Duration::from_secs(3);

/// Authenticated, project-scoped context shared read-only by every job
/// of one automation run. Not persisted; lifetime is one run.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub project_id: String,
    pub project_name: String,
}

/// Establish a session: create a project, activate it, wait out the
/// activation delay.
///
/// Fails with [`LabsError::Authentication`] when the credential is
/// rejected or the response cannot be interpreted; the caller must
/// abort the whole run rather than retry per job.
pub async fn bootstrap_session(gateway: &LabsGateway) -> Result<SessionContext, LabsError> {
    let title = format!("Veo Project - {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"));
    let body = serde_json::json!({
        "json": {
            "projectTitle": title,
            "toolName": TOOL_NAME,
        }
    });

    let url = format!("{}{}", gateway.labs_base_url(), CREATE_PROJECT_PATH);
    let response = gateway
        .post_json(&url, &body)
        .await
        .map_err(|e| LabsError::Authentication(format!("Project creation failed: {e}")))?;

    let session = parse_project_response(&response)?;
    tracing::info!(
        project_id = %session.project_id,
        project_name = %session.project_name,
        "Created Labs project",
    );

    activate_project(gateway, &session.project_id).await;
    tokio::time::sleep(ACTIVATION_DELAY).await;

    Ok(session)
}

/// Parse the nested tRPC payload of the create-project call.
pub fn parse_project_response(value: &serde_json::Value) -> Result<SessionContext, LabsError> {
    let result = value.pointer("/result/data/json/result");

    let project_id = result
        .and_then(|r| r.get("projectId"))
        .and_then(serde_json::Value::as_str);
    let project_name = result
        .and_then(|r| r.pointer("/projectInfo/projectTitle"))
        .and_then(serde_json::Value::as_str);

    match (project_id, project_name) {
        (Some(id), Some(name)) => Ok(SessionContext {
            project_id: id.to_string(),
            project_name: name.to_string(),
        }),
        _ => Err(LabsError::Authentication(
            "Project creation response is missing projectId or projectTitle".to_string(),
        )),
    }
}

/// Fire the activation GET for a freshly created project.
///
/// Best-effort: the remote sometimes serves this route inconsistently,
/// and generation works without it after the activation delay, so
/// failures are logged and swallowed.
async fn activate_project(gateway: &LabsGateway, project_id: &str) {
    let url = format!(
        "{}/fx/next/data/{}/flow/project/{}.json?projectId={}",
        gateway.labs_base_url(),
        NEXT_DATA_ID,
        project_id,
        project_id,
    );

    if let Err(e) = gateway.get_json(&url).await {
        tracing::warn!(project_id, error = %e, "Could not activate project session");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
