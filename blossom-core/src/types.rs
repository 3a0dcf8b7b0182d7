use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::Digest;
use url::Url;

use crate::error::{BlossomError, BlossomResult};

/// Lowercase hex SHA-256 digest identifying a blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sha256(String);

impl Sha256 {
    /// Parse a 64 character hex digest, normalizing to lowercase
    pub fn parse(value: &str) -> BlossomResult<Self> {
        let value = value.trim();
        if value.len() != 64 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BlossomError::invalid(format!(
                "not a sha256 digest: {value}"
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Hash raw bytes
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode(sha2::Sha256::digest(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sha256 {
    type Err = BlossomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Sha256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Sha256::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A server origin, normalized to its root path.
///
/// Two servers are considered the same when their hostnames match;
/// scheme and port are kept for building request URLs only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Server(Url);

impl Server {
    pub fn parse(value: &str) -> BlossomResult<Self> {
        let url = Url::parse(value.trim())
            .map_err(|e| BlossomError::invalid(format!("invalid server url {value}: {e}")))?;
        Self::from_url(url)
    }

    pub fn from_url(mut url: Url) -> BlossomResult<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BlossomError::invalid(format!(
                "unsupported server scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(BlossomError::invalid(format!("server url has no host: {url}")));
        }
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url))
    }

    pub fn hostname(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn same_host(&self, other: &Server) -> bool {
        self.hostname().eq_ignore_ascii_case(other.hostname())
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Resolve an endpoint path against the server root
    pub fn endpoint(&self, path: &str) -> BlossomResult<Url> {
        self.0
            .join(path.trim_start_matches('/'))
            .map_err(|e| BlossomError::invalid(format!("invalid endpoint {path}: {e}")))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for Server {
    type Err = BlossomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Server {
    type Error = BlossomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Server> for String {
    fn from(server: Server) -> Self {
        server.0.into()
    }
}

/// Descriptor a server returns for a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDescriptor {
    pub sha256: Sha256,
    pub size: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub url: String,
    /// Unix seconds; older servers send `created`
    #[serde(alias = "created", default)]
    pub uploaded: i64,
}

impl BlobDescriptor {
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.uploaded, 0).single()
    }
}

/// Raw content handed to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Bytes,
    pub mime_type: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a hash provider computes for a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub sha256: Sha256,
    pub size: u64,
    pub mime_type: Option<String>,
}

/// A payload paired with its metadata, computed once and then shared
/// by every request that needs the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBlob {
    pub payload: Payload,
    pub metadata: BlobMetadata,
}

impl PreparedBlob {
    pub fn new(payload: Payload, metadata: BlobMetadata) -> Self {
        Self { payload, metadata }
    }

    pub fn sha256(&self) -> &Sha256 {
        &self.metadata.sha256
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.metadata.mime_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.payload.bytes
    }
}
