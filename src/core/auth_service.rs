//! Login, logout and identity lookups against the backend.

use tracing::{debug, warn};

use crate::api::{LoginRequest, LoginResponse, User};
use crate::core::constants::{LOGIN_PATH, LOGOUT_PATH, ME_PATH};
use crate::core::credentials::CredentialError;
use crate::core::request::{ApiClient, RequestError};

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
    device_info: Option<String>,
}

impl AuthService {
    pub fn new(client: ApiClient, device_info: Option<String>) -> Self {
        Self {
            client,
            device_info,
        }
    }

    /// Exchange username and password for a token and remember both the
    /// token and the username the server reports.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, RequestError> {
        let request = self.client.post(LOGIN_PATH).json(&LoginRequest {
            username,
            password,
            device_info: self.device_info.as_deref(),
        });
        let response: LoginResponse = self.client.send_json(request).await?;

        let store = self.client.credentials();
        store.set_token(&response.access_token)?;
        store.set_username(&response.username)?;
        debug!(username = %response.username, expires_in = response.expires_in, "Logged in");
        Ok(response)
    }

    /// Tell the backend to invalidate the token, then forget it locally.
    /// The local credentials are cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), CredentialError> {
        if let Err(err) = self.client.send(self.client.post(LOGOUT_PATH)).await {
            warn!(error = %err, "Logout request failed; clearing local credentials anyway");
        }
        self.client.credentials().clear()
    }

    pub async fn current_user(&self) -> Result<User, RequestError> {
        self.client.send_json(self.client.get(ME_PATH)).await
    }

    pub fn is_logged_in(&self) -> Result<bool, CredentialError> {
        Ok(self.client.credentials().token()?.is_some())
    }

    pub fn stored_username(&self) -> Result<Option<String>, CredentialError> {
        self.client.credentials().username()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::utils::test_utils::{api_client, logged_in_store, MockReply, MockServer};
    use std::sync::Arc;

    #[tokio::test]
    async fn login_stores_token_and_username() {
        let server = MockServer::start(vec![MockReply::json(
            200,
            "OK",
            serde_json::json!({
                "access_token": "fresh",
                "token_type": "bearer",
                "username": "admin",
                "expires_in": 86400
            }),
        )])
        .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = AuthService::new(
            api_client(&server.base_url, Arc::clone(&store)),
            Some("terminal".to_string()),
        );

        let response = auth.login("admin", "admin123").await.expect("login");

        assert_eq!(response.expires_in, 86400);
        assert_eq!(store.token().unwrap().as_deref(), Some("fresh"));
        assert_eq!(auth.stored_username().unwrap().as_deref(), Some("admin"));
        assert!(auth.is_logged_in().unwrap());

        let requests = server.requests().await;
        assert!(requests[0].request_line.starts_with("POST /auth/login "));
        assert_eq!(requests[0].header("authorization"), None);
        let body = requests[0].json();
        assert_eq!(body["username"], "admin");
        assert_eq!(body["password"], "admin123");
        assert_eq!(body["device_info"], "terminal");
    }

    #[tokio::test]
    async fn failed_login_keeps_store_empty() {
        let server = MockServer::start(vec![MockReply::json(
            401,
            "Unauthorized",
            serde_json::json!({"detail": "Incorrect username or password"}),
        )])
        .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = AuthService::new(api_client(&server.base_url, Arc::clone(&store)), None);

        let err = auth.login("admin", "wrong").await.expect_err("should fail");

        assert_eq!(err.to_string(), "Incorrect username or password");
        assert!(!auth.is_logged_in().unwrap());
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() {
        let server = MockServer::start(vec![MockReply::json(
            500,
            "Internal Server Error",
            serde_json::json!({"detail": "logout failed"}),
        )])
        .await;
        let store = logged_in_store();
        let auth = AuthService::new(api_client(&server.base_url, Arc::clone(&store)), None);

        auth.logout().await.expect("local clear succeeds");

        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.username().unwrap(), None);
        let requests = server.requests().await;
        assert!(requests[0].request_line.starts_with("POST /auth/logout "));
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret-token"));
    }

    #[tokio::test]
    async fn current_user_rejection_purges_credentials() {
        let server = MockServer::start(vec![MockReply::json(
            401,
            "Unauthorized",
            serde_json::json!({"detail": "Token invalid"}),
        )])
        .await;
        let store = logged_in_store();
        let auth = AuthService::new(api_client(&server.base_url, Arc::clone(&store)), None);

        let err = auth.current_user().await.expect_err("should fail");

        assert!(err.is_unauthorized());
        assert!(!auth.is_logged_in().unwrap());
        assert_eq!(auth.stored_username().unwrap(), None);
    }

    #[tokio::test]
    async fn current_user_and_health_decode() {
        let server = MockServer::start(vec![
            MockReply::json(
                200,
                "OK",
                serde_json::json!({"username": "alice", "message": "ok"}),
            ),
            MockReply::json(
                200,
                "OK",
                serde_json::json!({"status": "ok", "message": "running"}),
            ),
        ])
        .await;
        let client = api_client(&server.base_url, logged_in_store());
        let auth = AuthService::new(client.clone(), None);

        let user = auth.current_user().await.expect("user");
        assert_eq!(user.username, "alice");

        let health = client.health().await.expect("health");
        assert_eq!(health.status, "ok");
        assert_eq!(health.message, "running");
    }
}
