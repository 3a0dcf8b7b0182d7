//! Driving one blob to an ordered list of servers.
//!
//! Servers are processed one at a time in list order. The first server to
//! accept content holds the canonical blob; the rest mirror it, falling back
//! to a full upload when mirroring fails. One server failing never aborts
//! the run. Cancellation does.

use std::sync::Arc;

use blossom_core::{
    prepare_blob, AuthResolver, BlobDescriptor, BlossomError, BlossomResult, HashProvider,
    NoopProgress, Payload, PaymentResolver, PreparedBlob, ProgressSink, Server, Sha256Hasher,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::actions::{mirror_blob, upload_blob, upload_media};
use crate::auth_cache::{BlobPaymentResolver, CachingAuthResolver};
use crate::config::{MediaPolicy, MultiServerConfig};
use crate::options::{ActionOptions, AuthMode};
use crate::transport::Transport;

/// How a server came to hold the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Media,
    Upload,
    Mirror,
}

/// Where a server is in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    MediaAttempted,
    MirrorAttempted,
    UploadAttempted,
    Done,
    Errored,
}

impl ServerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Done | ServerState::Errored)
    }
}

#[derive(Debug, Clone)]
pub struct ServerOutcome {
    pub server: Server,
    pub state: ServerState,
    pub delivery: Option<Delivery>,
    pub descriptor: Option<BlobDescriptor>,
}

/// Per-server results of a run, in server list order.
///
/// Servers are identified by hostname; a server without a descriptor failed.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationResult {
    outcomes: Vec<ServerOutcome>,
    canonical: Option<usize>,
}

impl OrchestrationResult {
    /// One outcome per distinct hostname, first occurrence wins
    fn new(servers: &[Server]) -> Self {
        let mut outcomes: Vec<ServerOutcome> = Vec::with_capacity(servers.len());
        for server in servers {
            if outcomes.iter().any(|o| o.server.same_host(server)) {
                debug!(server = %server, "skipping duplicate server");
                continue;
            }
            outcomes.push(ServerOutcome {
                server: server.clone(),
                state: ServerState::NotStarted,
                delivery: None,
                descriptor: None,
            });
        }
        Self {
            outcomes,
            canonical: None,
        }
    }

    pub fn get(&self, server: &Server) -> Option<&BlobDescriptor> {
        self.outcome(server)?.descriptor.as_ref()
    }

    pub fn contains(&self, server: &Server) -> bool {
        self.get(server).is_some()
    }

    pub fn delivery(&self, server: &Server) -> Option<Delivery> {
        self.outcome(server)?.delivery
    }

    pub fn outcome(&self, server: &Server) -> Option<&ServerOutcome> {
        self.outcomes.iter().find(|o| o.server.same_host(server))
    }

    pub fn outcomes(&self) -> &[ServerOutcome] {
        &self.outcomes
    }

    /// Successful servers and their descriptors
    pub fn iter(&self) -> impl Iterator<Item = (&Server, &BlobDescriptor)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.descriptor.as_ref().map(|d| (&o.server, d)))
    }

    /// Server and descriptor the other servers mirrored from
    pub fn canonical(&self) -> Option<(&Server, &BlobDescriptor)> {
        let outcome = self.outcomes.get(self.canonical?)?;
        Some((&outcome.server, outcome.descriptor.as_ref()?))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn server(&self, index: usize) -> &Server {
        &self.outcomes[index].server
    }

    fn state(&self, index: usize) -> ServerState {
        self.outcomes[index].state
    }

    fn advance(&mut self, index: usize, state: ServerState) {
        self.outcomes[index].state = state;
    }

    fn complete(&mut self, index: usize, descriptor: BlobDescriptor, delivery: Delivery) {
        let outcome = &mut self.outcomes[index];
        outcome.state = ServerState::Done;
        outcome.delivery = Some(delivery);
        outcome.descriptor = Some(descriptor);
        if self.canonical.is_none() {
            self.canonical = Some(index);
        }
    }

    fn canonical_source(&self) -> Option<BlobDescriptor> {
        self.outcomes.get(self.canonical?)?.descriptor.clone()
    }
}

/// Uploads one blob to many servers with media, mirror and upload fallbacks
#[derive(Clone)]
pub struct MultiServerUpload {
    transport: Arc<dyn Transport>,
    hasher: Arc<dyn HashProvider>,
    auth_resolver: Option<Arc<dyn AuthResolver>>,
    payment_resolver: Option<Arc<dyn PaymentResolver>>,
    progress: Arc<dyn ProgressSink>,
    auth: AuthMode,
    config: MultiServerConfig,
}

impl MultiServerUpload {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            hasher: Arc::new(Sha256Hasher),
            auth_resolver: None,
            payment_resolver: None,
            progress: Arc::new(NoopProgress),
            auth: AuthMode::Auto,
            config: MultiServerConfig::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn HashProvider>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_auth_resolver(mut self, resolver: Arc<dyn AuthResolver>) -> Self {
        self.auth_resolver = Some(resolver);
        self
    }

    pub fn with_payment_resolver(mut self, resolver: Arc<dyn PaymentResolver>) -> Self {
        self.payment_resolver = Some(resolver);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// A preset token seeds the run's auth cache instead of being forced on every request
    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_config(mut self, config: MultiServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MultiServerConfig {
        &self.config
    }

    /// Hash `payload` once, then upload it to every server
    pub async fn upload(
        &self,
        servers: &[Server],
        payload: Payload,
        cancel: CancellationToken,
    ) -> BlossomResult<OrchestrationResult> {
        let blob = prepare_blob(self.hasher.as_ref(), payload).await?;
        self.upload_prepared(servers, &blob, cancel).await
    }

    #[instrument(skip_all, fields(sha256 = %blob.sha256(), servers = servers.len()))]
    pub async fn upload_prepared(
        &self,
        servers: &[Server],
        blob: &PreparedBlob,
        cancel: CancellationToken,
    ) -> BlossomResult<OrchestrationResult> {
        self.config.validate().map_err(BlossomError::invalid)?;

        let mut run = OrchestrationResult::new(servers);
        let (upload_options, mirror_options) = self.action_options(blob, cancel.clone());

        if self.config.media {
            let accepted = self.media_phase(&mut run, blob, &upload_options).await?;
            if !accepted {
                if !self.config.media_fallback {
                    warn!("no server accepted the media upload");
                    return Err(BlossomError::NoMediaServer);
                }
                info!("no media server, falling back to raw uploads");
            }
        }

        for index in 0..run.outcomes.len() {
            if run.state(index).is_terminal() {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(BlossomError::Cancelled);
            }
            let server = run.server(index).clone();
            self.progress.on_start(&server, blob.sha256(), blob);

            let delivered = self
                .deliver(&mut run, index, &server, blob, &upload_options, &mirror_options)
                .await;
            match delivered {
                Ok((descriptor, delivery)) => {
                    debug!(server = %server, ?delivery, "server holds blob");
                    self.progress.on_upload(&server, &descriptor, blob);
                    run.complete(index, descriptor, delivery);
                }
                Err(err) if err.is_cancellation() => return Err(err),
                Err(err) => self.report(&mut run, index, blob, &err),
            }
        }

        info!(stored = run.len(), "multi-server upload finished");
        Ok(run)
    }

    /// Options for uploads and for mirrors; both share one auth cache
    fn action_options(
        &self,
        blob: &PreparedBlob,
        cancel: CancellationToken,
    ) -> (ActionOptions, ActionOptions) {
        let (auth, seed) = match &self.auth {
            AuthMode::Preset(event) => (AuthMode::Auto, Some(event.clone())),
            other => (other.clone(), None),
        };
        let base = ActionOptions {
            cancel,
            timeout: None,
            auth,
            payment: None,
            auth_resolver: Some(Arc::new(CachingAuthResolver::new(
                self.auth_resolver.clone(),
                blob.clone(),
                seed,
            ))),
            payment_resolver: Some(Arc::new(BlobPaymentResolver::new(
                self.payment_resolver.clone(),
                blob.clone(),
            ))),
        };
        let uploads = ActionOptions {
            timeout: self.config.request_timeout,
            ..base.clone()
        };
        let mirrors = ActionOptions {
            timeout: self.config.mirror_timeout,
            ..base
        };
        (uploads, mirrors)
    }

    /// Try `/media` on the candidate servers; true once one accepts
    async fn media_phase(
        &self,
        run: &mut OrchestrationResult,
        blob: &PreparedBlob,
        options: &ActionOptions,
    ) -> BlossomResult<bool> {
        let candidates = match self.config.media_policy {
            MediaPolicy::First => run.outcomes.len().min(1),
            MediaPolicy::Any => run.outcomes.len(),
        };

        for index in 0..candidates {
            let server = run.server(index).clone();
            run.advance(index, ServerState::MediaAttempted);
            self.progress.on_start(&server, blob.sha256(), blob);

            match upload_media(self.transport.as_ref(), &server, blob, options).await {
                Ok(descriptor) => {
                    info!(server = %server, sha256 = %descriptor.sha256, "media upload accepted");
                    self.progress.on_upload(&server, &descriptor, blob);
                    run.complete(index, descriptor, Delivery::Media);
                    return Ok(true);
                }
                Err(BlossomError::MediaUnsupported { .. }) => {
                    debug!(server = %server, "not a media server");
                }
                Err(err) if err.is_cancellation() => return Err(err),
                Err(err) => {
                    // still eligible for a mirror or raw upload
                    self.notify(&server, blob, &err);
                    run.advance(index, ServerState::NotStarted);
                }
            }
        }
        Ok(false)
    }

    async fn deliver(
        &self,
        run: &mut OrchestrationResult,
        index: usize,
        server: &Server,
        blob: &PreparedBlob,
        upload_options: &ActionOptions,
        mirror_options: &ActionOptions,
    ) -> BlossomResult<(BlobDescriptor, Delivery)> {
        let transport = self.transport.as_ref();

        if let Some(source) = run.canonical_source() {
            run.advance(index, ServerState::MirrorAttempted);
            match mirror_blob(transport, server, &source, mirror_options).await {
                Ok(descriptor) => return Ok((descriptor, Delivery::Mirror)),
                Err(err) if err.is_cancellation() => return Err(err),
                // media mode never stores a raw variant
                Err(err) if self.config.media => return Err(err),
                Err(err) => {
                    debug!(server = %server, error = %err, "mirror failed, uploading instead");
                }
            }
        }

        run.advance(index, ServerState::UploadAttempted);
        let descriptor = upload_blob(transport, server, blob, upload_options).await?;
        Ok((descriptor, Delivery::Upload))
    }

    fn report(
        &self,
        run: &mut OrchestrationResult,
        index: usize,
        blob: &PreparedBlob,
        err: &BlossomError,
    ) {
        let server = run.server(index).clone();
        run.advance(index, ServerState::Errored);
        self.notify(&server, blob, err);
    }

    fn notify(&self, server: &Server, blob: &PreparedBlob, err: &BlossomError) {
        warn!(server = %server, error = %err, "server failed");
        self.progress.on_error(server, blob.sha256(), blob, err);
    }
}
