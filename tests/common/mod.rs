#![allow(dead_code)]
//! In-process stub servers for the integration tests.
//!
//! `StubHttpServer` answers raw HTTP/1.1 with canned responses and records
//! every request it sees. `StubWsServer` accepts WebSocket upgrades and hands
//! each accepted connection to the test as a `WsConn`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bid_review_link::{BidLinkError, KeyValueStore};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── HTTP ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> StubResponse + Send + Sync>;

pub struct StubHttpServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubHttpServer {
    /// Serve every request with `handler`. The base URL ends in `/api`.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve_http(stream, handler, recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}/api", addr),
            requests,
            task,
        }
    }

    /// Always answer with the same response.
    pub async fn fixed(response: StubResponse) -> Self {
        Self::start(move |_| response.clone()).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request was recorded")
    }
}

impl Drop for StubHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_http(
    mut stream: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let request = RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    };
    let response = handler(&request);
    recorded.lock().unwrap().push(request);

    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    stream.write_all(raw.as_bytes()).await?;
    stream.shutdown().await
}

/// A URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

/// A WebSocket URL nothing listens on.
pub async fn unreachable_ws_url() -> String {
    unreachable_base_url()
        .await
        .replacen("http://", "ws://", 1)
        .replace("/api", "/ws/updates/")
}

// ── WebSocket ───────────────────────────────────────────────────────────────

/// One accepted WebSocket connection, server side.
pub struct WsConn {
    pub uri: String,
    pub authorization: Option<String>,
    stream: WebSocketStream<TcpStream>,
}

impl WsConn {
    pub async fn send_json(&mut self, value: JsonValue) {
        self.stream
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    /// Like `send_json`, but tolerates a client that already went away.
    pub async fn try_send_json(&mut self, value: JsonValue) -> bool {
        self.stream
            .send(Message::Text(value.to_string().into()))
            .await
            .is_ok()
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    /// Next text frame from the client, skipping control frames.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            let frame = timeout(TEST_TIMEOUT, self.stream.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => return Some(text.as_str().to_string()),
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Wait until the client goes away.
    pub async fn wait_closed(&mut self) -> bool {
        timeout(TEST_TIMEOUT, async {
            while let Some(frame) = self.stream.next().await {
                if matches!(frame, Ok(Message::Close(_)) | Err(_)) {
                    break;
                }
            }
        })
        .await
        .is_ok()
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

pub struct StubWsServer {
    pub url: String,
    conns: mpsc::UnboundedReceiver<WsConn>,
    task: JoinHandle<()>,
}

impl StubWsServer {
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Refuse every upgrade with `status`.
    pub async fn rejecting(status: u16) -> Self {
        Self::start_with(Some(status)).await
    }

    async fn start_with(reject: Option<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, conns) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let seen = Arc::new(Mutex::new((String::new(), None::<String>)));
                    let capture = seen.clone();
                    let callback = move |req: &Request, resp: Response| {
                        let auth = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        *capture.lock().unwrap() = (req.uri().to_string(), auth);
                        match reject {
                            Some(status) => {
                                let mut error = ErrorResponse::new(None);
                                *error.status_mut() = StatusCode::from_u16(status).unwrap();
                                Err(error)
                            },
                            None => Ok(resp),
                        }
                    };
                    if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                        let (uri, authorization) = seen.lock().unwrap().clone();
                        let _ = tx.send(WsConn {
                            uri,
                            authorization,
                            stream: ws,
                        });
                    }
                });
            }
        });

        Self {
            url: format!("ws://{}/ws/updates/", addr),
            conns,
            task,
        }
    }

    /// Next accepted connection, or `None` if none arrives in time.
    pub async fn accept(&mut self) -> Option<WsConn> {
        timeout(TEST_TIMEOUT, self.conns.recv()).await.ok().flatten()
    }

    /// `true` if no connection arrives within `wait`.
    pub async fn no_connection_within(&mut self, wait: Duration) -> bool {
        timeout(wait, self.conns.recv()).await.is_err()
    }
}

impl Drop for StubWsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll `condition` until it holds or the test timeout passes.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ── Storage ─────────────────────────────────────────────────────────────────

/// Key/value store whose reads and deletes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> bid_review_link::Result<Option<String>> {
        Err(BidLinkError::StorageError(format!("cannot read {}", key)))
    }

    fn set(&self, _key: &str, _value: &str) -> bid_review_link::Result<()> {
        Ok(())
    }

    fn remove(&self, key: &str) -> bid_review_link::Result<()> {
        Err(BidLinkError::StorageError(format!("cannot remove {}", key)))
    }
}
