#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blossom_client::transport::headers;
use blossom_client::{HttpRequest, HttpResponse, Transport};
use blossom_core::{
    hash_from_url, AuthRequest, AuthResolver, AuthTemplate, AuthType, BlobDescriptor,
    BlossomError, BlossomResult, Payload, PaymentContext, PaymentProof, PaymentResolver,
    PreparedBlob, ProgressSink, Server, Sha256, SignedEvent,
};
use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};

pub const CONTENT: &[u8] = b"test content";
pub const PAYMENT_TOKEN: &str = "cashuAeyJ0b2tlbiI6W119";

/// How a mock server behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Healthy,
    /// 404 on every `/media` request
    NoMedia,
    /// 401 until an Authorization header is sent
    RequireAuth,
    /// 402 until an X-Cashu header is sent
    RequirePayment,
    /// connection refused
    Offline,
    /// 500 on everything
    Broken,
    /// 500 on `/mirror` only
    BrokenMirror,
    /// 500 on `/media` only
    BrokenMedia,
    /// 404 on `HEAD /upload`
    NoUploadHead,
    /// 404 on `HEAD /upload`, 401 on anything else without an Authorization header
    NoUploadHeadRequireAuth,
    /// 401 forever
    Unauthorized,
    /// 403 until an Authorization header is sent
    Forbidden,
    /// healthy, but waits before answering
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub cashu: Option<String>,
    pub sha256: Option<String>,
    pub content_length: Option<String>,
    pub body: Bytes,
}

impl Hit {
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn auth_event(&self) -> Option<SignedEvent> {
        let encoded = self.authorization.as_deref()?.strip_prefix("Nostr ")?;
        serde_json::from_slice(&STANDARD.decode(encoded).ok()?).ok()
    }
}

pub struct MockServer {
    pub server: Server,
    kind: Kind,
    hits: Mutex<Vec<Hit>>,
    blobs: Mutex<HashMap<String, (Bytes, BlobDescriptor)>>,
}

impl MockServer {
    pub fn new(url: &str, kind: Kind) -> Arc<Self> {
        Arc::new(Self {
            server: Server::parse(url).unwrap(),
            kind,
            hits: Mutex::new(Vec::new()),
            blobs: Mutex::new(HashMap::new()),
        })
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.hits().iter().map(Hit::endpoint).collect()
    }

    pub fn store(&self, body: &[u8]) -> BlobDescriptor {
        self.save(Bytes::copy_from_slice(body), None)
    }

    fn record(&self, request: &HttpRequest) {
        self.hits.lock().unwrap().push(Hit {
            method: request.method.clone(),
            path: request.url.path().to_string(),
            query: request.url.query().map(str::to_string),
            authorization: request.header("authorization").map(str::to_string),
            cashu: request.header(headers::CASHU).map(str::to_string),
            sha256: request.header(headers::SHA256).map(str::to_string),
            content_length: request.header(headers::CONTENT_LENGTH).map(str::to_string),
            body: request.body.clone().unwrap_or_default(),
        });
    }

    fn descriptor(&self, sha256: Sha256, size: u64, mime_type: Option<String>) -> BlobDescriptor {
        BlobDescriptor {
            url: format!("{}{}", self.server, sha256),
            sha256,
            size,
            mime_type,
            uploaded: 1_700_000_000,
        }
    }

    fn save(&self, body: Bytes, mime_type: Option<String>) -> BlobDescriptor {
        let descriptor = self.descriptor(Sha256::of(&body), body.len() as u64, mime_type);
        self.blobs
            .lock()
            .unwrap()
            .insert(descriptor.sha256.to_string(), (body, descriptor.clone()));
        descriptor
    }

    fn challenge(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let authorized = request.header("authorization").is_some();
        let upload_head = request.method == Method::HEAD && request.url.path() == "/upload";
        match self.kind {
            Kind::NoUploadHead | Kind::NoUploadHeadRequireAuth if upload_head => {
                Some(text(404, "not found"))
            }
            Kind::NoUploadHeadRequireAuth if !authorized => Some(status(401)),
            Kind::Unauthorized => Some(status(401)),
            Kind::RequireAuth if !authorized => Some(status(401)),
            Kind::Forbidden if !authorized => Some(status(403)),
            Kind::RequirePayment if request.header(headers::CASHU).is_none() => {
                let requirement = STANDARD.encode(r#"{"a":10,"u":"sat","m":["https://mint.example"]}"#);
                let mut response = status(402);
                response
                    .headers
                    .insert(headers::CASHU, HeaderValue::from_str(&requirement).unwrap());
                Some(response)
            }
            Kind::Broken => Some(text(500, "internal error")),
            Kind::BrokenMirror if request.url.path() == "/mirror" => {
                Some(text(500, "mirror failed"))
            }
            Kind::BrokenMedia if request.url.path() == "/media" => {
                Some(text(500, "transcoder crashed"))
            }
            Kind::NoMedia if request.url.path() == "/media" => Some(status(404)),
            _ => None,
        }
    }

    fn respond(&self, request: &HttpRequest) -> HttpResponse {
        if let Some(challenge) = self.challenge(request) {
            return challenge;
        }
        let body = request.body.clone().unwrap_or_default();
        let mime = request.header("content-type").map(str::to_string);
        let path = request.url.path().trim_start_matches('/');

        match (request.method.as_str(), path) {
            ("HEAD", "upload" | "media") => status(200),
            ("PUT", "upload") => json(&self.save(body, mime)),
            ("PUT", "media") => {
                let mut optimized = body.to_vec();
                optimized.extend_from_slice(b" (optimized)");
                json(&self.save(Bytes::from(optimized), mime))
            }
            ("PUT", "mirror") => {
                let source: serde_json::Value = serde_json::from_slice(&body).unwrap();
                let url = source["url"].as_str().unwrap_or_default();
                match hash_from_url(url) {
                    Some(sha256) => {
                        let size = request
                            .header(headers::CONTENT_LENGTH)
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        json(&self.descriptor(sha256, size, None))
                    }
                    None => text(400, "missing url"),
                }
            }
            ("GET", path) if path.starts_with("list/") => {
                let listed: Vec<BlobDescriptor> = self
                    .blobs
                    .lock()
                    .unwrap()
                    .values()
                    .map(|(_, d)| d.clone())
                    .collect();
                json(&listed)
            }
            (method, hash) => {
                let mut blobs = self.blobs.lock().unwrap();
                match (method, blobs.get(hash).cloned()) {
                    ("GET", Some((bytes, _))) => {
                        let mut response = status(200);
                        response.body = bytes;
                        response
                    }
                    ("HEAD", Some(_)) => status(200),
                    ("DELETE", Some(_)) => {
                        blobs.remove(hash);
                        status(200)
                    }
                    _ => text(404, "blob not found"),
                }
            }
        }
    }
}

fn status(code: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(code).unwrap())
}

fn text(code: u16, body: &str) -> HttpResponse {
    let mut response = status(code);
    response.body = Bytes::from(body.to_string());
    response
}

fn json<T: serde::Serialize>(value: &T) -> HttpResponse {
    let mut response = status(200);
    response.body = Bytes::from(serde_json::to_vec(value).unwrap());
    response
}

/// Routes requests to mock servers by hostname
#[derive(Clone, Default)]
pub struct MockNetwork {
    servers: Vec<Arc<MockServer>>,
}

impl MockNetwork {
    pub fn new(servers: &[Arc<MockServer>]) -> Self {
        Self {
            servers: servers.to_vec(),
        }
    }
}

#[async_trait]
impl Transport for MockNetwork {
    async fn send(&self, request: HttpRequest) -> BlossomResult<HttpResponse> {
        let host = request.url.host_str().unwrap_or_default().to_string();
        let server = self
            .servers
            .iter()
            .find(|s| s.server.hostname() == host)
            .cloned()
            .ok_or_else(|| {
                BlossomError::transport(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("unknown host {host}"),
                ))
            })?;

        server.record(&request);
        match server.kind {
            Kind::Offline => Err(BlossomError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Kind::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(server.respond(&request))
            }
            _ => Ok(server.respond(&request)),
        }
    }
}

/// Auth resolver that signs hash-scoped tokens and counts calls
#[derive(Default)]
pub struct CountingAuth {
    pub calls: AtomicUsize,
    pub actions: Mutex<Vec<AuthType>>,
}

impl CountingAuth {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn fake_sign(template: AuthTemplate) -> SignedEvent {
    let draft = template.build(chrono::Utc::now());
    SignedEvent {
        id: "e".repeat(64),
        pubkey: "p".repeat(64),
        created_at: draft.created_at,
        kind: draft.kind,
        tags: draft.tags,
        content: draft.content,
        sig: "s".repeat(128),
    }
}

#[async_trait]
impl AuthResolver for CountingAuth {
    async fn resolve_auth(&self, request: AuthRequest<'_>) -> anyhow::Result<SignedEvent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.actions.lock().unwrap().push(request.action);
        let template = AuthTemplate::new(request.action);
        let template = match request.sha256 {
            Some(hash) => template.with_hash(hash.clone()),
            None => template.with_server(request.server.clone()),
        };
        Ok(fake_sign(template))
    }
}

/// Payment resolver returning a fixed token
#[derive(Default)]
pub struct FixedPayment {
    pub calls: AtomicUsize,
    pub amounts: Mutex<Vec<Option<u64>>>,
}

#[async_trait]
impl PaymentResolver for FixedPayment {
    async fn resolve_payment(&self, context: PaymentContext<'_>) -> anyhow::Result<PaymentProof> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.amounts
            .lock()
            .unwrap()
            .push(context.requirement.amount);
        Ok(PaymentProof::new(PAYMENT_TOKEN))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    Upload(String),
    Error(String, String),
}

/// Progress sink recording every callback
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(host, message) => Some((host, message)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_start(&self, server: &Server, _sha256: &Sha256, _blob: &PreparedBlob) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Start(server.hostname().to_string()));
    }

    fn on_upload(&self, server: &Server, _descriptor: &BlobDescriptor, _blob: &PreparedBlob) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Upload(server.hostname().to_string()));
    }

    fn on_error(&self, server: &Server, _sha256: &Sha256, _blob: &PreparedBlob, error: &BlossomError) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Error(server.hostname().to_string(), error.to_string()));
    }
}

pub fn payload() -> Payload {
    Payload::new(CONTENT).with_mime_type("text/plain")
}

pub fn prepared() -> PreparedBlob {
    PreparedBlob::new(
        payload(),
        blossom_core::BlobMetadata {
            sha256: Sha256::of(CONTENT),
            size: CONTENT.len() as u64,
            mime_type: Some("text/plain".to_string()),
        },
    )
}
