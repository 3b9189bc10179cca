//! Minimal HTTP/1.1 mock backend for end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::credentials::{Credential, MemoryCredentialStore};
use crate::core::request::ApiClient;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// How the mock answers one accepted connection.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json {
        status: u16,
        reason: &'static str,
        body: String,
    },
    /// Close-delimited body written piece by piece with a pause in between.
    Streamed {
        status: u16,
        reason: &'static str,
        pieces: Vec<Vec<u8>>,
        pause: Duration,
    },
    /// Announce `declared_len` bytes, send only `body`, then hang up.
    Truncated {
        declared_len: usize,
        body: String,
    },
    /// Read the request and never answer within `hold`.
    Stall { hold: Duration },
}

impl MockReply {
    pub fn json(status: u16, reason: &'static str, body: serde_json::Value) -> Self {
        MockReply::Json {
            status,
            reason,
            body: body.to_string(),
        }
    }

    pub fn stream(pieces: &[&str]) -> Self {
        MockReply::Streamed {
            status: 200,
            reason: "OK",
            pieces: pieces.iter().map(|piece| piece.as_bytes().to_vec()).collect(),
            pause: Duration::from_millis(15),
        }
    }

    pub fn stream_bytes(pieces: Vec<Vec<u8>>) -> Self {
        MockReply::Streamed {
            status: 200,
            reason: "OK",
            pieces,
            pause: Duration::from_millis(15),
        }
    }
}

pub struct MockServer {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Serve `replies` in order, one per connection.
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_for_server = Arc::clone(&captured);

        let task = tokio::spawn(async move {
            for reply in replies {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let Ok(request) = read_http_request(&mut stream).await else {
                    return;
                };
                captured_for_server.lock().await.push(request);
                write_reply(&mut stream, reply).await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
            task,
        }
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().await.clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut data = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        data.extend_from_slice(&chunk[..read]);
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

async fn write_reply(stream: &mut TcpStream, reply: MockReply) {
    match reply {
        MockReply::Json {
            status,
            reason,
            body,
        } => {
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
        MockReply::Streamed {
            status,
            reason,
            pieces,
            pause,
        } => {
            let head = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n"
            );
            if stream.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for piece in pieces {
                if stream.write_all(&piece).await.is_err() {
                    return;
                }
                let _ = stream.flush().await;
                tokio::time::sleep(pause).await;
            }
        }
        MockReply::Truncated { declared_len, body } => {
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {declared_len}\r\n\r\n{body}"
            );
            if stream.write_all(response.as_bytes()).await.is_err() {
                return;
            }
            let _ = stream.flush().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        MockReply::Stall { hold } => {
            tokio::time::sleep(hold).await;
        }
    }
    let _ = stream.shutdown().await;
}

/// HTTP client that ignores proxy environment variables.
pub fn test_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .expect("test client should build")
}

pub fn logged_in_store() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_credential(Credential {
        token: Some("secret-token".to_string()),
        username: Some("alice".to_string()),
    }))
}

pub fn api_client(base_url: &str, store: Arc<MemoryCredentialStore>) -> ApiClient {
    ApiClient::with_http_client(test_http_client(Duration::from_secs(5)), base_url, store)
}
