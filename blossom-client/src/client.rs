use std::sync::Arc;
use std::time::Duration;

use blossom_core::{
    prepare_blob, AuthResolver, BlobDescriptor, BlossomResult, HashProvider, Payload,
    PaymentResolver, PreparedBlob, Server, Sha256, Sha256Hasher, Signer, SignerAuth,
};
use bytes::Bytes;

use crate::actions::{
    delete_blob, download_blob, has_blob, list_blobs, mirror_blob, upload_blob, upload_media,
    ListQuery,
};
use crate::config::MultiServerConfig;
use crate::options::ActionOptions;
use crate::orchestrator::MultiServerUpload;
use crate::transport::{ReqwestTransport, Transport};

/// The main Blossom client - holds the transport and injected capabilities once
#[derive(Clone)]
pub struct BlossomClient {
    transport: Arc<dyn Transport>,
    hasher: Arc<dyn HashProvider>,
    auth: Option<Arc<dyn AuthResolver>>,
    payment: Option<Arc<dyn PaymentResolver>>,
    timeout: Option<Duration>,
}

impl Default for BlossomClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BlossomClient {
    /// Client over a default reqwest transport
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            hasher: Arc::new(Sha256Hasher),
            auth: None,
            payment: None,
            timeout: None,
        }
    }

    pub fn with_hasher<H: HashProvider + 'static>(mut self, hasher: H) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Sign auth tokens on demand with `signer`
    pub fn with_signer<S: Signer + 'static>(self, signer: S) -> Self {
        self.with_auth_resolver(SignerAuth::new(signer))
    }

    pub fn with_auth_resolver<A: AuthResolver + 'static>(mut self, resolver: A) -> Self {
        self.auth = Some(Arc::new(resolver));
        self
    }

    pub fn with_payment_resolver<P: PaymentResolver + 'static>(mut self, resolver: P) -> Self {
        self.payment = Some(Arc::new(resolver));
        self
    }

    /// Per-request timeout for every action
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default options carrying this client's resolvers and timeout
    pub fn options(&self) -> ActionOptions {
        ActionOptions {
            timeout: self.timeout,
            auth_resolver: self.auth.clone(),
            payment_resolver: self.payment.clone(),
            ..ActionOptions::default()
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Hash a payload so it can be sent to several servers
    pub async fn prepare(&self, payload: Payload) -> BlossomResult<PreparedBlob> {
        prepare_blob(self.hasher.as_ref(), payload).await
    }

    pub async fn upload(&self, server: &Server, blob: &PreparedBlob) -> BlossomResult<BlobDescriptor> {
        upload_blob(self.transport(), server, blob, &self.options()).await
    }

    pub async fn upload_media(
        &self,
        server: &Server,
        blob: &PreparedBlob,
    ) -> BlossomResult<BlobDescriptor> {
        upload_media(self.transport(), server, blob, &self.options()).await
    }

    pub async fn mirror(
        &self,
        server: &Server,
        blob: &BlobDescriptor,
    ) -> BlossomResult<BlobDescriptor> {
        mirror_blob(self.transport(), server, blob, &self.options()).await
    }

    pub async fn download(&self, server: &Server, sha256: &Sha256) -> BlossomResult<Bytes> {
        download_blob(self.transport(), server, sha256, &self.options()).await
    }

    pub async fn has_blob(&self, server: &Server, sha256: &Sha256) -> BlossomResult<bool> {
        has_blob(self.transport(), server, sha256, &self.options()).await
    }

    pub async fn list(
        &self,
        server: &Server,
        pubkey: &str,
        query: ListQuery,
    ) -> BlossomResult<Vec<BlobDescriptor>> {
        list_blobs(self.transport(), server, pubkey, query, &self.options()).await
    }

    pub async fn delete(&self, server: &Server, sha256: &Sha256) -> BlossomResult<bool> {
        delete_blob(self.transport(), server, sha256, &self.options()).await
    }

    /// Multi-server uploader sharing this client's transport and resolvers.
    ///
    /// The client timeout bounds uploads when the config sets none.
    pub fn multi_server(&self, mut config: MultiServerConfig) -> MultiServerUpload {
        if config.request_timeout.is_none() {
            config.request_timeout = self.timeout;
        }
        let mut upload = MultiServerUpload::new(self.transport.clone())
            .with_hasher(self.hasher.clone())
            .with_config(config);
        if let Some(auth) = &self.auth {
            upload = upload.with_auth_resolver(auth.clone());
        }
        if let Some(payment) = &self.payment {
            upload = upload.with_payment_resolver(payment.clone());
        }
        upload
    }
}
