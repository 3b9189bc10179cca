//! Shared constants used across the application

/// Keychain service name under which credentials are stored.
pub const KEYRING_SERVICE: &str = "kbchat";
pub const TOKEN_ACCOUNT: &str = "access_token";
pub const USERNAME_ACCOUNT: &str = "username";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const BASE_URL_ENV: &str = "KBCHAT_BASE_URL";

pub const LOGIN_PATH: &str = "auth/login";
pub const LOGOUT_PATH: &str = "auth/logout";
pub const ME_PATH: &str = "auth/me";
pub const HEALTH_PATH: &str = "health";
pub const CHAT_PATH: &str = "chat";
pub const CHAT_STREAM_PATH: &str = "chat/stream";

/// Status the backend answers with when the bearer token is missing,
/// expired or superseded by a login on another device.
pub const UNAUTHORIZED_STATUS: u16 = 401;

pub const CONNECTIVITY_MESSAGE: &str = "Network connection failed, please check your network";
pub const TIMEOUT_MESSAGE: &str = "Request timed out";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";
