use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use blossom_core::{AuthResolver, PaymentProof, PaymentResolver, SignedEvent};
use tokio_util::sync::CancellationToken;

/// How a call handles authorization
#[derive(Debug, Clone, Default)]
pub enum AuthMode {
    /// Authorize only when the server challenges
    #[default]
    Auto,
    /// Resolve a token up front and attach it to the first request
    Always,
    /// Never authorize; a challenge fails the call
    Disabled,
    /// Use this token for the first request and for any challenge
    Preset(SignedEvent),
}

/// Per-call options shared by every action
#[derive(Clone)]
pub struct ActionOptions {
    /// Cancelling aborts the in-flight request
    pub cancel: CancellationToken,
    /// Limit for each individual request
    pub timeout: Option<Duration>,
    pub auth: AuthMode,
    /// Proof attached to the first request
    pub payment: Option<PaymentProof>,
    pub auth_resolver: Option<Arc<dyn AuthResolver>>,
    pub payment_resolver: Option<Arc<dyn PaymentResolver>>,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: None,
            auth: AuthMode::Auto,
            payment: None,
            auth_resolver: None,
            payment_resolver: None,
        }
    }
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_preset_auth(self, event: SignedEvent) -> Self {
        self.with_auth(AuthMode::Preset(event))
    }

    pub fn with_payment(mut self, proof: PaymentProof) -> Self {
        self.payment = Some(proof);
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
}

impl fmt::Debug for ActionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOptions")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("timeout", &self.timeout)
            .field("auth", &self.auth)
            .field("payment", &self.payment.is_some())
            .field("auth_resolver", &self.auth_resolver.is_some())
            .field("payment_resolver", &self.payment_resolver.is_some())
            .finish()
    }
}
