use std::sync::Arc;

use async_trait::async_trait;
use blossom_core::{
    AuthRequest, AuthResolver, AuthType, BlobRef, BlossomError, Handler, PaymentContext,
    PaymentProof, PaymentResolver, PreparedBlob, Server, Sha256, SignedEvent,
};
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

/// Capability tokens collected during one multi-server run
#[derive(Debug, Clone, Default)]
pub struct AuthCache {
    events: Vec<SignedEvent>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: SignedEvent) {
        self.events.push(event);
    }

    /// First unexpired token whose action matches and whose hash or server scope covers the request
    pub fn find(
        &self,
        server: &Server,
        sha256: Option<&Sha256>,
        action: AuthType,
        now: i64,
    ) -> Option<&SignedEvent> {
        self.events
            .iter()
            .find(|event| event.covers(server, sha256, action, now))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Auth resolver used inside a run: answers from the cache, otherwise
/// asks the caller's resolver about the original blob and remembers the token.
pub(crate) struct CachingAuthResolver {
    inner: Option<Arc<dyn AuthResolver>>,
    cache: Mutex<AuthCache>,
    blob: PreparedBlob,
}

impl CachingAuthResolver {
    pub(crate) fn new(
        inner: Option<Arc<dyn AuthResolver>>,
        blob: PreparedBlob,
        seed: Option<SignedEvent>,
    ) -> Self {
        let mut cache = AuthCache::new();
        if let Some(event) = seed {
            cache.insert(event);
        }
        Self {
            inner,
            cache: Mutex::new(cache),
            blob,
        }
    }

    #[cfg(test)]
    pub(crate) fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

#[async_trait]
impl AuthResolver for CachingAuthResolver {
    async fn resolve_auth(&self, request: AuthRequest<'_>) -> anyhow::Result<SignedEvent> {
        let now = Utc::now().timestamp();
        let cached = self
            .cache
            .lock()
            .find(request.server, request.sha256, request.action, now)
            .cloned();
        if let Some(event) = cached {
            debug!(server = %request.server, action = %request.action, "reusing cached auth");
            return Ok(event);
        }

        let inner = self
            .inner
            .as_ref()
            .ok_or(BlossomError::MissingHandler(Handler::Auth))?;
        debug!(server = %request.server, action = %request.action, "requesting new auth");
        let event = inner
            .resolve_auth(AuthRequest {
                blob: BlobRef::Payload(&self.blob),
                ..request
            })
            .await?;
        self.cache.lock().insert(event.clone());
        Ok(event)
    }
}

/// Payment resolver used inside a run: always reports the original blob
pub(crate) struct BlobPaymentResolver {
    inner: Option<Arc<dyn PaymentResolver>>,
    blob: PreparedBlob,
}

impl BlobPaymentResolver {
    pub(crate) fn new(inner: Option<Arc<dyn PaymentResolver>>, blob: PreparedBlob) -> Self {
        Self { inner, blob }
    }
}

#[async_trait]
impl PaymentResolver for BlobPaymentResolver {
    async fn resolve_payment(&self, context: PaymentContext<'_>) -> anyhow::Result<PaymentProof> {
        let inner = self
            .inner
            .as_ref()
            .ok_or(BlossomError::MissingHandler(Handler::Payment))?;
        inner
            .resolve_payment(PaymentContext {
                blob: BlobRef::Payload(&self.blob),
                ..context
            })
            .await
    }
}
