//! Decoding of single `data: <json>` lines from the answer stream.

use serde::Deserialize;
use tracing::warn;

use crate::api::Source;

const DATA_PREFIX: &str = "data: ";

/// One decoded stream event. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamEvent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

impl StreamEvent {
    /// The server-reported failure, ignoring empty strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_done() || self.error_message().is_some()
    }
}

/// Parse one line of the stream body.
///
/// Returns `None` for blank lines, lines without the `data: ` prefix, and
/// payloads that do not decode as a [`StreamEvent`]. Decode failures are
/// logged and never abort the stream.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload = trimmed.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, line = %line, "Dropping undecodable stream event");
            None
        }
    }
}

/// Parse every line of a multi-line block, keeping only decodable events.
pub fn parse_chunk(chunk: &str) -> Vec<StreamEvent> {
    chunk.split('\n').filter_map(parse_line).collect()
}
