//! Endpoint URL helpers.

/// Strip trailing slashes so endpoint joins never produce `//`.
///
/// ```
/// use kbchat::utils::url::trim_base_url;
///
/// assert_eq!(trim_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(trim_base_url("https://kb.example.com/api//"), "https://kb.example.com/api");
/// ```
pub fn trim_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Join a backend base URL and an endpoint path with exactly one slash.
///
/// ```
/// use kbchat::utils::url::join_endpoint;
///
/// assert_eq!(
///     join_endpoint("http://localhost:8000/", "/chat/stream"),
///     "http://localhost:8000/chat/stream"
/// );
/// ```
pub fn join_endpoint(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        trim_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}
