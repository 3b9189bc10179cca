//! Request and response payloads exchanged with the question answering backend.

use serde::{Deserialize, Serialize};

/// Where a cited answer fragment came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    KnowledgeBase,
    WebSearch,
    Other(String),
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::KnowledgeBase => "knowledge_base",
            SourceKind::WebSearch => "web_search",
            SourceKind::Other(kind) => kind.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SourceKind::KnowledgeBase => "kb",
            SourceKind::WebSearch => "web",
            SourceKind::Other(kind) => kind.as_str(),
        }
    }
}

impl From<String> for SourceKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "knowledge_base" => SourceKind::KnowledgeBase,
            "web_search" => SourceKind::WebSearch,
            _ => SourceKind::Other(value),
        }
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_web_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_hybrid: Option<bool>,
}

impl<'a> ChatRequest<'a> {
    pub fn new(question: &'a str) -> Self {
        Self {
            question,
            use_web_search: None,
            use_hybrid: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub username: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Error body returned by the backend for rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_known_and_unknown_values() {
        let source: Source =
            serde_json::from_str(r#"{"type":"knowledge_base","title":"doc"}"#).unwrap();
        assert_eq!(source.kind, SourceKind::KnowledgeBase);
        assert_eq!(source.url, None);

        let other: Source =
            serde_json::from_str(r#"{"type":"forum","title":"thread","url":"https://x"}"#)
                .unwrap();
        assert_eq!(other.kind, SourceKind::Other("forum".to_string()));
        let encoded = serde_json::to_value(&other).unwrap();
        assert_eq!(encoded["type"], "forum");
        assert_eq!(encoded["url"], "https://x");
        assert!(encoded.get("repo").is_none());
    }

    #[test]
    fn chat_request_omits_unset_flags() {
        let encoded = serde_json::to_string(&ChatRequest::new("what is rag?")).unwrap();
        assert_eq!(encoded, r#"{"question":"what is rag?"}"#);
    }

    #[test]
    fn error_body_tolerates_missing_detail() {
        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.detail.is_none());
    }
}
