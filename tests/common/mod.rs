//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use terminal_gateway::config::GatewayConfig;
use terminal_gateway::upstream::GroqClient;
use terminal_gateway::xml::{extract, parse_document, Document, ExtractionPolicy, FieldSet};
use terminal_gateway::{AppState, HttpServer, Shutdown};

/// A request received by a mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(MockRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

/// Start a programmable JSON backend on an ephemeral port.
pub async fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };
    let f = Arc::new(f);
    let handle = backend.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        handle.hits.fetch_add(1, Ordering::SeqCst);
                        let (status, body) = f(&request);
                        handle.requests.lock().unwrap().push(request);

                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Start a backend that always answers with the same body.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| (status, body.to_string())).await
}

/// Address that refuses connections.
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1".to_string()
}

/// Config pointing every upstream at unreachable addresses, no delays.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.viacep.base_url = unreachable_url();
    config.viacep.timeout_secs = 2;
    config.nominatim.base_url = unreachable_url();
    config.nominatim.request_delay_ms = 0;
    config.nominatim.timeout_secs = 2;
    config.groq.base_url = unreachable_url();
    config.groq.timeout_secs = 2;
    config.postal_search.probe_timeout_ms = 500;
    config.observability.metrics_enabled = false;
    config
}

/// A running gateway.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST an XML body and decode the reply.
    pub async fn post_xml(&self, path: &str, xml: &str) -> Reply {
        let res = self
            .client
            .post(self.url(path))
            .header("content-type", "application/xml; charset=utf-8")
            .body(xml.to_string())
            .send()
            .await
            .expect("gateway unreachable");
        Reply::read(res).await
    }

    /// POST a Field/Value request built from `fields`.
    pub async fn post_fields(&self, path: &str, fields: &[(&str, &str)]) -> Reply {
        let xml = terminal_gateway::xml::writer::request_payload(fields.iter().copied()).unwrap();
        self.post_xml(path, &xml).await
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway with `config` and an optional LLM key.
pub async fn start_gateway_with_key(config: GatewayConfig, groq_key: Option<&str>) -> Gateway {
    let groq = GroqClient::new(&config.groq, groq_key.map(str::to_string)).unwrap();
    let state = AppState::with_groq(config, groq).unwrap();
    let server = HttpServer::from_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    Gateway {
        addr,
        shutdown,
        client,
    }
}

pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    start_gateway_with_key(config, None).await
}

/// UTF-16LE bytes of `text`.
pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// A decoded gateway reply.
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub xml: String,
    pub document: Document,
    pub fields: FieldSet,
}

impl Reply {
    pub async fn read(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = res.bytes().await.unwrap().to_vec();
        assert_eq!(bytes.len() % 2, 0, "UTF-16 body must have an even length");

        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        let xml = String::from_utf16(&units).expect("body is not UTF-16LE");
        let document = parse_document(&xml).expect("body is not XML");
        let fields = extract(&document, &ExtractionPolicy::standard());

        Self {
            status,
            content_type,
            bytes,
            xml,
            document,
            fields,
        }
    }

    /// Child of `ReturnValueV2` / `ReturnValue`.
    pub fn return_value(&self, tag: &str) -> Option<&str> {
        self.document
            .elements()
            .find(|e| e.name == "ReturnValueV2" || e.name == "ReturnValue")
            .and_then(|e| e.child_text(tag))
    }

    /// Child of `MessageV2` / `Message`.
    pub fn message(&self, tag: &str) -> Option<&str> {
        self.document
            .elements()
            .find(|e| e.name == "MessageV2" || e.name == "Message")
            .and_then(|e| e.child_text(tag))
    }

    pub fn field(&self, id: &str) -> Option<&str> {
        self.fields.get(id)
    }

    pub fn is_error(&self) -> bool {
        self.return_value("ShortText") == Some("Erro")
    }
}
