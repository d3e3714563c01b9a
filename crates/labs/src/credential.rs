//! Session credentials and the remote credential store.
//!
//! A [`SessionCredential`] is the cookie/bearer pair a browser session
//! would carry. Credentials are either supplied directly by the caller
//! or fetched from a [`CredentialStore`] endpoint that hands out the
//! currently active credential in exchange for an account token.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LabsError;

// ---------------------------------------------------------------------------
// SessionCredential
// ---------------------------------------------------------------------------

/// Stored browser-session credential for the Labs platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCredential {
    pub id: String,
    /// Display name of the credential (account label).
    pub name: String,
    /// Raw `Cookie` header value.
    #[serde(rename = "value")]
    pub cookie_value: String,
    /// Bearer token for the sandbox API, with or without the
    /// `Bearer ` prefix.
    #[serde(rename = "bearerToken", default)]
    pub bearer_token: Option<String>,
}

impl SessionCredential {
    /// The bearer token with any leading `Bearer ` prefix stripped.
    ///
    /// Returns `None` when no usable token is stored.
    pub fn normalized_bearer(&self) -> Option<&str> {
        self.bearer_token
            .as_deref()
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t))
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Client for the endpoint that serves the active credential.
pub struct CredentialStore {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
}

impl CredentialStore {
    /// Create a store client.
    ///
    /// * `endpoint`   - full URL of the active-credential endpoint.
    /// * `auth_token` - account bearer token authorizing the fetch.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LabsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::gateway::GatewayError::Request)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
        })
    }

    /// Fetch the currently active credential.
    ///
    /// Any failure here is an [`LabsError::Authentication`]: without a
    /// credential the run cannot proceed and retrying per job cannot
    /// succeed.
    pub async fn fetch_active(&self) -> Result<SessionCredential, LabsError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| LabsError::Authentication(format!("Credential fetch failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LabsError::Authentication(format!("Credential fetch failed: {e}")))?;

        if !status.is_success() {
            return Err(LabsError::Authentication(format!(
                "Credential store returned HTTP {status}: {body}"
            )));
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|_| {
            LabsError::Authentication(format!("Credential store response is not JSON: {body}"))
        })?;

        parse_credential_response(&value)
    }
}

/// Parse the credential-store payload `{success, message, cookie}`.
pub fn parse_credential_response(value: &serde_json::Value) -> Result<SessionCredential, LabsError> {
    let success = value
        .get("success")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    if !success {
        let message = value
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("No active credential available");
        return Err(LabsError::Authentication(message.to_string()));
    }

    let cookie = value
        .get("cookie")
        .cloned()
        .ok_or_else(|| LabsError::Authentication("Credential response has no cookie".to_string()))?;

    serde_json::from_value(cookie)
        .map_err(|e| LabsError::Authentication(format!("Malformed credential payload: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn credential(bearer: Option<&str>) -> SessionCredential {
        SessionCredential {
            id: "c-1".into(),
            name: "account-a".into(),
            cookie_value: "SID=abc".into(),
            bearer_token: bearer.map(String::from),
        }
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let cred = credential(Some("Bearer ya29.token"));
        assert_eq!(cred.normalized_bearer(), Some("ya29.token"));
    }

    #[test]
    fn bare_token_passes_through() {
        let cred = credential(Some("ya29.token"));
        assert_eq!(cred.normalized_bearer(), Some("ya29.token"));
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        assert_eq!(credential(Some("")).normalized_bearer(), None);
        assert_eq!(credential(None).normalized_bearer(), None);
    }

    #[test]
    fn parse_active_credential() {
        let value = json!({
            "success": true,
            "cookie": {
                "id": "c-1",
                "name": "account-a",
                "value": "SID=abc",
                "bearerToken": "Bearer tok"
            }
        });
        let cred = parse_credential_response(&value).expect("should parse");
        assert_eq!(cred.id, "c-1");
        assert_eq!(cred.cookie_value, "SID=abc");
        assert_eq!(cred.normalized_bearer(), Some("tok"));
    }

    #[test]
    fn unsuccessful_response_uses_server_message() {
        let value = json!({"success": false, "message": "quota exhausted"});
        let err = parse_credential_response(&value).unwrap_err();
        assert_matches!(err, LabsError::Authentication(msg) if msg == "quota exhausted");
    }

    #[test]
    fn missing_cookie_is_authentication_error() {
        let value = json!({"success": true});
        assert_matches!(
            parse_credential_response(&value),
            Err(LabsError::Authentication(_))
        );
    }
}
