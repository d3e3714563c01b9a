//! Authenticated HTTP gateway for the Labs platform.
//!
//! [`LabsGateway`] replays the headers a browser session would send
//! (user agent, origin, cookie, bearer token) and normalizes error
//! responses: transport failures and non-2xx statuses both surface as
//! [`GatewayError`] values rather than being inspected at call sites.

use std::time::Duration;

use reqwest::header;

use crate::credential::SessionCredential;

// ---------------------------------------------------------------------------
// Endpoints and headers
// ---------------------------------------------------------------------------

/// Base URL of the Labs web application (project/session calls).
pub const LABS_BASE_URL: &str = "https://labs.google";

/// Base URL of the sandbox video-generation API.
pub const VIDEO_API_BASE_URL: &str = "https://aisandbox-pa.googleapis.com/v1";

/// Host of the sandbox API; calls to it require a bearer token.
const SANDBOX_API_HOST: &str = "aisandbox-pa.googleapis.com";

/// Browser user agent replayed on every request.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Whether a URL targets the sandbox API and therefore requires a
/// bearer token in addition to the session cookie.
pub fn requires_bearer(url: &str) -> bool {
    url.contains(SANDBOX_API_HOST)
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Errors from the authenticated gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote returned a non-2xx status code.
    #[error("Labs API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("Invalid JSON in response body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// The target endpoint requires a bearer token but the credential
    /// does not carry one.
    #[error("Bearer token is required for the sandbox API")]
    MissingBearerToken,
}

// ---------------------------------------------------------------------------
// LabsGateway
// ---------------------------------------------------------------------------

/// Outbound HTTP client carrying one session credential.
pub struct LabsGateway {
    client: reqwest::Client,
    credential: SessionCredential,
    labs_base_url: String,
    video_api_base_url: String,
}

impl LabsGateway {
    /// Create a gateway for one credential with a per-request timeout.
    pub fn new(
        credential: SessionCredential,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            credential,
            labs_base_url: LABS_BASE_URL.to_string(),
            video_api_base_url: VIDEO_API_BASE_URL.to_string(),
        })
    }

    /// Override the base URLs (local test servers).
    pub fn with_base_urls(
        mut self,
        labs_base_url: impl Into<String>,
        video_api_base_url: impl Into<String>,
    ) -> Self {
        self.labs_base_url = labs_base_url.into();
        self.video_api_base_url = video_api_base_url.into();
        self
    }

    /// Base URL for Labs web-application calls.
    pub fn labs_base_url(&self) -> &str {
        &self.labs_base_url
    }

    /// Base URL for sandbox video-generation calls.
    pub fn video_api_base_url(&self) -> &str {
        &self.video_api_base_url
    }

    /// The credential this gateway authenticates with.
    pub fn credential(&self) -> &SessionCredential {
        &self.credential
    }

    /// POST a JSON body and parse the JSON response.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let request = self.authenticated(self.client.post(url), url)?.json(body);
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    /// GET a URL and parse the JSON response.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, GatewayError> {
        let request = self.authenticated(self.client.get(url), url)?;
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Attach the browser-session headers and credentials to a request.
    fn authenticated(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let mut request = request
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ORIGIN, LABS_BASE_URL)
            .header(header::REFERER, format!("{LABS_BASE_URL}/"));

        match self.credential.normalized_bearer() {
            Some(token) => request = request.bearer_auth(token),
            None if requires_bearer(url) => return Err(GatewayError::MissingBearerToken),
            None => {}
        }

        if !self.credential.cookie_value.is_empty() {
            request = request.header(header::COOKIE, &self.credential.cookie_value);
        }

        Ok(request)
    }

    /// Normalize a response: non-2xx becomes [`GatewayError::Api`], an
    /// empty body parses as `{}`.
    async fn parse_response(
        response: reqwest::Response,
    ) -> Result<serde_json::Value, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if body.is_empty() {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
