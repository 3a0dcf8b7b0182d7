use async_trait::async_trait;
use blossom_core::{BlossomError, BlossomResult};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Header names used by the Blossom protocol
pub mod headers {
    pub const SHA256: &str = "x-sha-256";
    pub const CONTENT_LENGTH: &str = "x-content-length";
    pub const CONTENT_TYPE: &str = "x-content-type";
    pub const REASON: &str = "x-reason";
    pub const CASHU: &str = blossom_core::CASHU_HEADER;
}

/// A request ready to be sent
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header, replacing any previous value
    pub fn set_header<N>(&mut self, name: N, value: &str) -> BlossomResult<()>
    where
        N: TryInto<HeaderName>,
        N::Error: std::fmt::Display,
    {
        let name = name
            .try_into()
            .map_err(|e| BlossomError::invalid(format!("invalid header name: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| BlossomError::invalid(format!("invalid value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A fully buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> BlossomResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends requests to servers. Implementations only move bytes;
/// challenge handling happens above this seam.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> BlossomResult<HttpResponse>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> BlossomResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(BlossomError::transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(BlossomError::transport)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
