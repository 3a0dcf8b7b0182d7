//! Capabilities injected by the caller: signing, hashing, auth, payment and progress.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::{AuthTemplate, AuthType, EventTemplate, SignedEvent, DEFAULT_AUTH_TTL};
use crate::error::BlossomError;
use crate::payment::{PaymentProof, PaymentRequest};
use crate::types::{BlobDescriptor, BlobMetadata, Payload, PreparedBlob, Server, Sha256};

/// Signs nostr event drafts
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, draft: EventTemplate) -> anyhow::Result<SignedEvent>;
}

/// Computes content metadata for a payload. Must be deterministic.
#[async_trait]
pub trait HashProvider: Send + Sync {
    async fn metadata(&self, payload: &Payload) -> anyhow::Result<BlobMetadata>;
}

/// The content a challenged request is about
#[derive(Debug, Clone, Copy)]
pub enum BlobRef<'a> {
    Payload(&'a PreparedBlob),
    Descriptor(&'a BlobDescriptor),
    None,
}

/// A server asked for authorization
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub server: &'a Server,
    pub action: AuthType,
    pub sha256: Option<&'a Sha256>,
    pub blob: BlobRef<'a>,
}

/// Produces capability tokens on demand
#[async_trait]
pub trait AuthResolver: Send + Sync {
    async fn resolve_auth(&self, request: AuthRequest<'_>) -> anyhow::Result<SignedEvent>;
}

/// A server asked for payment
#[derive(Debug, Clone, Copy)]
pub struct PaymentContext<'a> {
    pub server: &'a Server,
    pub sha256: Option<&'a Sha256>,
    pub blob: BlobRef<'a>,
    pub requirement: &'a PaymentRequest,
}

/// Produces payment proofs on demand
#[async_trait]
pub trait PaymentResolver: Send + Sync {
    async fn resolve_payment(&self, context: PaymentContext<'_>) -> anyhow::Result<PaymentProof>;
}

/// Observes a multi-server upload. Callbacks must not block.
pub trait ProgressSink: Send + Sync {
    fn on_start(&self, _server: &Server, _sha256: &Sha256, _blob: &PreparedBlob) {}

    fn on_upload(&self, _server: &Server, _descriptor: &BlobDescriptor, _blob: &PreparedBlob) {}

    fn on_error(
        &self,
        _server: &Server,
        _sha256: &Sha256,
        _blob: &PreparedBlob,
        _error: &BlossomError,
    ) {
    }
}

/// Progress sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// SHA-256 hash provider; MIME type comes from the payload
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl HashProvider for Sha256Hasher {
    async fn metadata(&self, payload: &Payload) -> anyhow::Result<BlobMetadata> {
        Ok(BlobMetadata {
            sha256: Sha256::of(&payload.bytes),
            size: payload.bytes.len() as u64,
            mime_type: payload.mime_type.clone(),
        })
    }
}

/// Hash a payload once so every later request reuses the digest
pub async fn prepare_blob(
    hasher: &dyn HashProvider,
    payload: Payload,
) -> Result<PreparedBlob, BlossomError> {
    let metadata = hasher
        .metadata(&payload)
        .await
        .map_err(BlossomError::from_resolver)?;
    Ok(PreparedBlob::new(payload, metadata))
}

/// Auth resolver that drafts a token for each challenge and signs it.
///
/// Tokens are scoped to the content hash when one is known, otherwise to the server.
pub struct SignerAuth<S> {
    signer: S,
    ttl: Duration,
}

impl<S: Signer> SignerAuth<S> {
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            ttl: DEFAULT_AUTH_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl<S: Signer> AuthResolver for SignerAuth<S> {
    async fn resolve_auth(&self, request: AuthRequest<'_>) -> anyhow::Result<SignedEvent> {
        let template = AuthTemplate::new(request.action).expires_in(self.ttl);
        let template = match request.sha256 {
            Some(hash) => template.with_hash(hash.clone()),
            None => template.with_server(request.server.clone()),
        };
        let draft = template.build(Utc::now());
        self.signer.sign(draft).await
    }
}
