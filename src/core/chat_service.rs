//! One question, one answer: single-shot and streaming exchanges.

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tracing::debug;

use crate::api::{ChatRequest, ChatResponse};
use crate::core::constants::{CHAT_PATH, CHAT_STREAM_PATH};
use crate::core::request::{ApiClient, RequestError};
use crate::core::stream_consumer::{Answer, StreamCallbacks, StreamConsumer, StreamHandle};

#[derive(Clone)]
pub struct ChatService {
    client: ApiClient,
}

impl ChatService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Ask and wait for the complete answer.
    pub async fn ask(&self, question: &str) -> Result<Answer, RequestError> {
        let request = self.client.post(CHAT_PATH).json(&ChatRequest::new(question));
        let response: ChatResponse = self.client.send_json(request).await?;
        Ok(Answer {
            text: response.answer,
            sources: response.sources,
        })
    }

    /// Start a streamed answer and return immediately.
    ///
    /// `callbacks` receive content as it arrives and exactly one of the
    /// completion or error hooks. The returned handle resolves to the same
    /// outcome and may be ignored. Must be called within a Tokio runtime.
    pub fn stream_ask(&self, question: &str, callbacks: StreamCallbacks) -> StreamHandle {
        let (consumer, handle) = StreamConsumer::new(callbacks);
        let client = self.client.clone();
        let question = question.to_string();
        tokio::spawn(drive_stream(client, question, consumer));
        handle
    }
}

async fn drive_stream(client: ApiClient, question: String, mut consumer: StreamConsumer) {
    debug!(question_chars = question.chars().count(), "Starting answer stream");
    let request = client
        .post(CHAT_STREAM_PATH)
        .header(ACCEPT, "text/event-stream")
        .json(&ChatRequest::new(&question));

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(err) => {
            consumer.on_failure(err.user_message());
            return;
        }
    };

    let status = response.status();
    debug!(status = %status, "Answer stream response received");
    if !status.is_success() {
        let err = RequestError::from_response(response).await;
        consumer.on_failure(err.user_message());
        return;
    }

    let mut body = response.bytes_stream();
    let mut text = BodyText::default();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                text.push(&bytes);
                consumer.on_data(text.as_str());
                if !consumer.is_open() {
                    return;
                }
            }
            Err(err) => {
                consumer.on_failure(RequestError::from_transport(err).user_message());
                return;
            }
        }
    }

    text.finish();
    consumer.on_data(text.as_str());
    consumer.on_finished(status.as_u16(), &reason_phrase(status));
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Cumulative body text decoded from raw byte chunks. A multi-byte
/// character split across chunks is held back until it is complete.
#[derive(Debug, Default)]
struct BodyText {
    text: String,
    pending: Vec<u8>,
}

impl BodyText {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid_len;
                        }
                        None => {
                            self.pending.drain(..valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush a trailing incomplete sequence as a replacement character.
    fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }

    fn as_str(&self) -> &str {
        &self.text
    }
}
