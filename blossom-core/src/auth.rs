//! Capability tokens (kind 24242 nostr events) that authorize Blossom requests.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BlossomResult;
use crate::types::{Server, Sha256};

/// Nostr event kind used for Blossom authorization
pub const AUTH_EVENT_KIND: u32 = 24242;

/// Default lifetime of a freshly drafted token
pub const DEFAULT_AUTH_TTL: Duration = Duration::from_secs(60 * 60);

/// The action a capability token authorizes (`t` tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Upload,
    Media,
    Get,
    List,
    Delete,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Upload => "upload",
            AuthType::Media => "media",
            AuthType::Get => "get",
            AuthType::List => "list",
            AuthType::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upload" => Some(AuthType::Upload),
            "media" => Some(AuthType::Media),
            "get" => Some(AuthType::Get),
            "list" => Some(AuthType::List),
            "delete" => Some(AuthType::Delete),
            _ => None,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            AuthType::Upload => "Upload Blob",
            AuthType::Media => "Upload Media",
            AuthType::Get => "Get Blobs",
            AuthType::List => "List Blobs",
            AuthType::Delete => "Delete Blob",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsigned event handed to a [`Signer`](crate::resolvers::Signer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub kind: u32,
    pub created_at: i64,
    pub content: String,
    pub tags: Vec<Vec<String>>,
}

/// A signed nostr event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    /// Values of every tag with the given name
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
    }

    pub fn auth_type(&self) -> Option<AuthType> {
        self.tag_value("t").and_then(AuthType::parse)
    }

    pub fn expiration(&self) -> Option<i64> {
        self.tag_value("expiration")?.parse().ok()
    }

    /// Tokens without an `expiration` tag never expire
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiration().is_some_and(|exp| exp <= now)
    }

    /// Whether this token may authorize `action` against `server` for `sha256`.
    ///
    /// The action must match the `t` tag and either an `x` tag must equal the
    /// content hash or a `server` tag must share the target hostname.
    pub fn covers(
        &self,
        server: &Server,
        sha256: Option<&Sha256>,
        action: AuthType,
        now: i64,
    ) -> bool {
        if self.auth_type() != Some(action) || self.is_expired_at(now) {
            return false;
        }
        let hash_match = sha256.is_some_and(|hash| {
            self.tag_values("x")
                .any(|x| x.eq_ignore_ascii_case(hash.as_str()))
        });
        hash_match
            || self
                .tag_values("server")
                .filter_map(|value| Server::parse(value).ok())
                .any(|scoped| scoped.same_host(server))
    }

    /// `Authorization` header value: `Nostr <base64(json)>`
    pub fn to_authorization_header(&self) -> BlossomResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("Nostr {}", STANDARD.encode(json)))
    }
}

/// Builder for kind 24242 drafts
#[derive(Debug, Clone)]
pub struct AuthTemplate {
    auth_type: AuthType,
    message: Option<String>,
    hashes: Vec<Sha256>,
    server: Option<Server>,
    expires_in: Duration,
    expiration: Option<i64>,
}

impl AuthTemplate {
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            message: None,
            hashes: Vec::new(),
            server: None,
            expires_in: DEFAULT_AUTH_TTL,
            expiration: None,
        }
    }

    pub fn upload(sha256: Sha256) -> Self {
        Self::new(AuthType::Upload).with_hash(sha256)
    }

    pub fn media(sha256: Sha256) -> Self {
        Self::new(AuthType::Media).with_hash(sha256)
    }

    pub fn delete(sha256: Sha256) -> Self {
        Self::new(AuthType::Delete).with_hash(sha256)
    }

    pub fn list(server: Server) -> Self {
        Self::new(AuthType::List).with_server(server)
    }

    pub fn download(server: Server) -> Self {
        Self::new(AuthType::Get).with_server(server)
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hash(mut self, sha256: Sha256) -> Self {
        if !self.hashes.contains(&sha256) {
            self.hashes.push(sha256);
        }
        self
    }

    pub fn with_server(mut self, server: Server) -> Self {
        self.server = Some(server);
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = ttl;
        self
    }

    /// Absolute unix expiration; overrides `expires_in`
    pub fn expires_at(mut self, expiration: i64) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn build(&self, now: DateTime<Utc>) -> EventTemplate {
        let created_at = now.timestamp();
        let expiration = self
            .expiration
            .unwrap_or_else(|| created_at + self.expires_in.as_secs() as i64);

        let mut tags = vec![
            vec!["t".to_string(), self.auth_type.as_str().to_string()],
            vec!["expiration".to_string(), expiration.to_string()],
        ];
        tags.extend(
            self.hashes
                .iter()
                .map(|hash| vec!["x".to_string(), hash.to_string()]),
        );
        if let Some(server) = &self.server {
            tags.push(vec!["server".to_string(), server.to_string()]);
        }

        EventTemplate {
            kind: AUTH_EVENT_KIND,
            created_at,
            content: self
                .message
                .clone()
                .unwrap_or_else(|| self.auth_type.default_message().to_string()),
            tags,
        }
    }
}
