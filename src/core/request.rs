//! Authenticated request layer shared by every backend call.
//!
//! [`ApiClient`] attaches the stored bearer token to outgoing requests,
//! purges the credential store when the backend rejects the token, and
//! turns every failure into a [`RequestError`] whose
//! [`user_message`](RequestError::user_message) follows one rule for both
//! single-shot and streaming calls.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{ApiErrorBody, HealthStatus};
use crate::core::constants::{
    CONNECTIVITY_MESSAGE, HEALTH_PATH, SERVER_ERROR_MESSAGE, TIMEOUT_MESSAGE, UNAUTHORIZED_STATUS,
};
use crate::core::credentials::{CredentialError, CredentialStore};
use crate::utils::url::{join_endpoint, trim_base_url};

#[derive(Debug)]
pub enum RequestError {
    /// The server answered with a non-success status.
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    /// The request was sent but no usable response came back.
    Connect(reqwest::Error),
    Timeout(reqwest::Error),
    /// The response body did not match the expected shape.
    Decode(reqwest::Error),
    Transport(reqwest::Error),
    Credentials(CredentialError),
}

impl RequestError {
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout(err)
        } else if err.is_connect() || err.is_request() {
            RequestError::Connect(err)
        } else if err.is_decode() {
            RequestError::Decode(err)
        } else {
            RequestError::Transport(err)
        }
    }

    /// Build a status error from a rejected response, keeping the server's
    /// `detail` message when the body carries one.
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let detail = match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|body| body.detail)
                .filter(|detail| !detail.trim().is_empty()),
            Err(err) => {
                debug!(error = %err, "Could not read error response body");
                None
            }
        };
        RequestError::Status { status, detail }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status()
            .is_some_and(|status| status.as_u16() == UNAUTHORIZED_STATUS)
    }

    /// Human-readable message: server detail, then connectivity or timeout
    /// text for requests without a response, then the raw transport message.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            RequestError::Status {
                status,
                detail: None,
            } => format!("{SERVER_ERROR_MESSAGE} (HTTP {})", status.as_u16()),
            RequestError::Connect(_) => CONNECTIVITY_MESSAGE.to_string(),
            RequestError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            RequestError::Decode(err) | RequestError::Transport(err) => err.to_string(),
            RequestError::Credentials(err) => err.to_string(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RequestError::Status { .. } => None,
            RequestError::Connect(err)
            | RequestError::Timeout(err)
            | RequestError::Decode(err)
            | RequestError::Transport(err) => Some(err),
            RequestError::Credentials(err) => Some(err),
        }
    }
}

impl From<CredentialError> for RequestError {
    fn from(err: CredentialError) -> Self {
        RequestError::Credentials(err)
    }
}

/// Add `Authorization: Bearer <token>` when a token is present.
pub fn attach_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

/// Backend client bound to one base URL and one credential store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RequestError::Transport)?;
        Ok(Self::with_http_client(http, base_url, credentials))
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url).to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(join_endpoint(&self.base_url, path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(join_endpoint(&self.base_url, path))
    }

    /// Send with the current credential attached and return the response
    /// whatever its status. A 401 purges stored credentials first.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, RequestError> {
        let token = match self.credentials.token() {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "Could not read stored token; sending unauthenticated");
                None
            }
        };
        if token.is_none() {
            debug!("No stored token; request goes out unauthenticated");
        }

        let response = attach_bearer(request, token.as_deref())
            .send()
            .await
            .map_err(RequestError::from_transport)?;

        if response.status().as_u16() == UNAUTHORIZED_STATUS {
            self.purge_credentials();
        }
        Ok(response)
    }

    /// Like [`execute`](Self::execute) but non-success statuses become errors.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RequestError> {
        let response = self.execute(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(RequestError::from_response(response).await)
        }
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RequestError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(RequestError::from_transport)
    }

    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        self.send_json(self.get(HEALTH_PATH)).await
    }

    fn purge_credentials(&self) {
        warn!("Backend rejected the credential; clearing stored token and username");
        if let Err(err) = self.credentials.clear() {
            warn!(error = %err, "Failed to clear stored credentials");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::MemoryCredentialStore;

    fn client() -> ApiClient {
        ApiClient::with_http_client(
            reqwest::Client::new(),
            "http://localhost:8000/",
            Arc::new(MemoryCredentialStore::new()),
        )
    }

    #[test]
    fn bearer_header_only_when_token_present() {
        let api = client();

        let with_token = attach_bearer(api.get("auth/me"), Some("tok"))
            .build()
            .unwrap();
        assert_eq!(
            with_token.headers()[reqwest::header::AUTHORIZATION],
            "Bearer tok"
        );
        assert_eq!(with_token.url().as_str(), "http://localhost:8000/auth/me");

        let without = attach_bearer(api.get("health"), None).build().unwrap();
        assert!(without
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .is_none());

        let empty = attach_bearer(api.get("health"), Some("")).build().unwrap();
        assert!(empty.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn status_errors_prefer_server_detail() {
        let with_detail = RequestError::Status {
            status: StatusCode::UNAUTHORIZED,
            detail: Some("Invalid token".to_string()),
        };
        assert_eq!(with_detail.user_message(), "Invalid token");
        assert!(with_detail.is_unauthorized());

        let bare = RequestError::Status {
            status: StatusCode::BAD_GATEWAY,
            detail: None,
        };
        assert_eq!(bare.user_message(), "Server error (HTTP 502)");
        assert!(!bare.is_unauthorized());
        assert_eq!(bare.to_string(), bare.user_message());
    }
}
