//! Incremental consumer for the line-oriented answer stream.
//!
//! The transport reports progress as the *cumulative* body text received so
//! far, possibly repeating the same length or splitting lines and multi-byte
//! characters at arbitrary points. [`StreamConsumer`] folds each report into a
//! [`StreamBuffer`], hands every complete line to
//! [`parse_line`](crate::core::event_line::parse_line), forwards content to the
//! caller as it arrives, and settles the stream exactly once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::api::Source;
use crate::core::event_line::{parse_line, StreamEvent};

/// Final result of a stream: the accumulated answer or a user-facing message.
pub type StreamOutcome = Result<Answer, String>;

/// The caller-visible result of a completed stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub sources: Option<Vec<Source>>,
}

/// Accumulates transport output and hands back complete lines.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    raw: String,
    consumed_len: usize,
}

impl StreamBuffer {
    /// Fold any text beyond `consumed_len` into the buffer.
    ///
    /// Returns false when the cumulative text has not grown.
    pub fn absorb(&mut self, cumulative: &str) -> bool {
        let Some(fresh) = cumulative.get(self.consumed_len..) else {
            return false;
        };
        if fresh.is_empty() {
            return false;
        }
        self.raw.push_str(fresh);
        self.consumed_len = cumulative.len();
        true
    }

    /// Remove and return every complete line, keeping the trailing partial one.
    pub fn drain_complete_lines(&mut self) -> Vec<String> {
        let Some(last_break) = memchr::memrchr(b'\n', self.raw.as_bytes()) else {
            return Vec::new();
        };
        let remainder = self.raw.split_off(last_break + 1);
        let complete = std::mem::replace(&mut self.raw, remainder);
        complete[..last_break]
            .split('\n')
            .map(str::to_owned)
            .collect()
    }

    /// Remove and return the unterminated tail.
    pub fn take_remainder(&mut self) -> String {
        std::mem::take(&mut self.raw)
    }

    pub fn consumed_len(&self) -> usize {
        self.consumed_len
    }

    pub fn pending(&self) -> &str {
        &self.raw
    }
}

/// Messages produced by [`StreamCallbacks::channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Complete(Option<Vec<Source>>),
    Error(String),
}

type ChunkFn = Box<dyn FnMut(&str) + Send>;
type CompleteFn = Box<dyn FnOnce(Option<Vec<Source>>) + Send>;
type ErrorFn = Box<dyn FnOnce(String) + Send>;

/// Caller hooks for one stream. `on_complete` and `on_error` are mutually
/// exclusive and fire at most once.
pub struct StreamCallbacks {
    on_chunk: ChunkFn,
    on_complete: CompleteFn,
    on_error: ErrorFn,
}

impl StreamCallbacks {
    pub fn new(
        on_chunk: impl FnMut(&str) + Send + 'static,
        on_complete: impl FnOnce(Option<Vec<Source>>) + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            on_chunk: Box::new(on_chunk),
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
        }
    }

    /// Hooks that do nothing; useful when only the [`StreamHandle`] matters.
    pub fn silent() -> Self {
        Self::new(|_| {}, |_| {}, |_| {})
    }

    /// Route every callback into an unbounded channel, in invocation order.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let chunk_tx = tx.clone();
        let complete_tx = tx.clone();
        let callbacks = Self::new(
            move |text| {
                let _ = chunk_tx.send(StreamMessage::Chunk(text.to_string()));
            },
            move |sources| {
                let _ = complete_tx.send(StreamMessage::Complete(sources));
            },
            move |message| {
                let _ = tx.send(StreamMessage::Error(message));
            },
        );
        (callbacks, rx)
    }
}

/// Awaitable one-shot completion signal for a stream.
///
/// The outcome is kept once received, so [`try_outcome`](Self::try_outcome)
/// and awaiting may be mixed freely and always agree. Dropping the handle
/// does not stop the stream; callbacks keep firing.
#[derive(Debug)]
pub struct StreamHandle {
    rx: Option<oneshot::Receiver<StreamOutcome>>,
    outcome: Option<StreamOutcome>,
}

const ENDED_WITHOUT_RESULT: &str = "Stream ended without a result";

impl StreamHandle {
    fn new(rx: oneshot::Receiver<StreamOutcome>) -> Self {
        Self {
            rx: Some(rx),
            outcome: None,
        }
    }

    /// Non-blocking check for a settled outcome.
    pub fn try_outcome(&mut self) -> Option<StreamOutcome> {
        if self.outcome.is_none() {
            if let Some(rx) = self.rx.as_mut() {
                match rx.try_recv() {
                    Ok(outcome) => self.store(outcome),
                    Err(oneshot::error::TryRecvError::Empty) => {}
                    Err(oneshot::error::TryRecvError::Closed) => {
                        self.store(Err(ENDED_WITHOUT_RESULT.to_string()))
                    }
                }
            }
        }
        self.outcome.clone()
    }

    fn store(&mut self, outcome: StreamOutcome) {
        self.rx = None;
        self.outcome = Some(outcome);
    }
}

impl Future for StreamHandle {
    type Output = StreamOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = &this.outcome {
            return Poll::Ready(outcome.clone());
        }
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(Err(ENDED_WITHOUT_RESULT.to_string()));
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(received) => {
                let outcome = received.unwrap_or_else(|_| Err(ENDED_WITHOUT_RESULT.to_string()));
                this.store(outcome.clone());
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Guards the terminal callbacks and the completion signal so the first
/// settlement wins and every later attempt is a no-op.
struct Settlement {
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
    signal: Option<oneshot::Sender<StreamOutcome>>,
}

impl Settlement {
    fn is_settled(&self) -> bool {
        self.signal.is_none()
    }

    fn resolve(&mut self, answer: &Answer) {
        let Some(signal) = self.signal.take() else {
            return;
        };
        self.on_error = None;
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(answer.sources.clone());
        }
        let _ = signal.send(Ok(answer.clone()));
    }

    fn reject(&mut self, message: String) {
        let Some(signal) = self.signal.take() else {
            return;
        };
        self.on_complete = None;
        if let Some(on_error) = self.on_error.take() {
            on_error(message.clone());
        }
        let _ = signal.send(Err(message));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Open,
    Completed,
    Failed,
}

pub struct StreamConsumer {
    buffer: StreamBuffer,
    state: ConsumerState,
    answer: Answer,
    on_chunk: ChunkFn,
    settlement: Settlement,
}

impl StreamConsumer {
    pub fn new(callbacks: StreamCallbacks) -> (Self, StreamHandle) {
        let (tx, rx) = oneshot::channel();
        let StreamCallbacks {
            on_chunk,
            on_complete,
            on_error,
        } = callbacks;
        let consumer = Self {
            buffer: StreamBuffer::default(),
            state: ConsumerState::Open,
            answer: Answer::default(),
            on_chunk,
            settlement: Settlement {
                on_complete: Some(on_complete),
                on_error: Some(on_error),
                signal: Some(tx),
            },
        };
        (consumer, StreamHandle::new(rx))
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConsumerState::Open
    }

    /// Text accumulated from content events so far.
    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Handle a "more data available" notification carrying the full body
    /// text received so far. Repeating a length already seen is a no-op.
    pub fn on_data(&mut self, cumulative: &str) {
        if !self.is_open() || !self.buffer.absorb(cumulative) {
            return;
        }

        for line in self.buffer.drain_complete_lines() {
            self.process_line(&line);
            if !self.is_open() {
                break;
            }
        }
    }

    /// Handle the transport finishing with an HTTP status.
    ///
    /// On success the unterminated tail is parsed as a final line and the
    /// stream completes if no terminal event was seen. Any other status fails
    /// the stream with a message naming the status.
    pub fn on_finished(&mut self, status: u16, status_text: &str) {
        if !self.is_open() {
            return;
        }

        if (200..300).contains(&status) {
            let remainder = self.buffer.take_remainder();
            if !remainder.trim().is_empty() {
                debug!(remainder = %remainder, "Parsing unterminated final stream line");
                self.process_line(&remainder);
            }
            if self.is_open() {
                self.complete(None);
            }
        } else {
            self.fail(format!("HTTP {status}: {status_text}"));
        }
    }

    /// Handle a transport-level failure such as a network error or timeout.
    pub fn on_failure(&mut self, message: impl Into<String>) {
        if self.is_open() {
            self.fail(message.into());
        }
    }

    fn process_line(&mut self, line: &str) {
        let Some(event) = parse_line(line) else {
            return;
        };
        self.apply_event(event);
    }

    fn apply_event(&mut self, event: StreamEvent) {
        if let Some(content) = event.content.as_deref() {
            self.answer.text.push_str(content);
            (self.on_chunk)(content);
        }

        if event.is_done() {
            match event.error_message() {
                Some(message) => self.fail(message.to_string()),
                None => self.complete(event.sources),
            }
        } else if let Some(message) = event.error_message() {
            self.fail(message.to_string());
        }
    }

    fn complete(&mut self, sources: Option<Vec<Source>>) {
        self.state = ConsumerState::Completed;
        self.answer.sources = sources;
        debug!(chars = self.answer.text.len(), "Stream completed");
        self.settlement.resolve(&self.answer);
    }

    fn fail(&mut self, message: String) {
        self.state = ConsumerState::Failed;
        debug!(error = %message, "Stream failed");
        self.settlement.reject(message);
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        if !self.settlement.is_settled() {
            self.settlement
                .reject("Stream closed before reaching a result".to_string());
        }
    }
}
