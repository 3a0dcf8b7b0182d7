//! Challenge resolution shared by every action.
//!
//! A request is sent once. A 401/403 answer triggers authorization and a 402
//! answer triggers payment; either way the request is resent exactly once with
//! the credential attached:
//!
//! ```text
//! INITIAL ──(no challenge)──────────────────────────▶ DONE | FAILED
//! INITIAL ──(401/403/402)──▶ RETRYING ──(response)──▶ DONE | FAILED
//! ```
//!
//! A second challenge on the retry is not resolved again.

use std::future::Future;

use blossom_core::{
    AuthRequest, AuthType, BlobRef, BlossomError, BlossomResult, Handler, PaymentContext,
    PaymentProof, PaymentRequest, Server, Sha256, SignedEvent,
};
use http::header::AUTHORIZATION;
use http::StatusCode;
use tracing::debug;

use crate::options::{ActionOptions, AuthMode};
use crate::transport::{headers, HttpRequest, HttpResponse, Transport};

/// How a response status steers an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    AuthChallenge,
    PaymentChallenge,
    NotFound,
    ServerError,
    Rejected,
}

impl ResponseClass {
    /// 401 and 403 are both treated as authorization challenges
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            200..=299 => ResponseClass::Success,
            401 | 403 => ResponseClass::AuthChallenge,
            402 => ResponseClass::PaymentChallenge,
            404 => ResponseClass::NotFound,
            500..=599 => ResponseClass::ServerError,
            _ => ResponseClass::Rejected,
        }
    }
}

/// Which challenge was resolved before the final response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    Auth,
    Payment,
}

/// Final response of a resolved request
#[derive(Debug, Clone)]
pub struct Resolution {
    pub response: HttpResponse,
    /// `Some` when the response came from the retry
    pub challenge: Option<Challenge>,
}

/// What a request is about, handed to resolvers when a challenge arrives
#[derive(Debug, Clone, Copy)]
pub struct ChallengeScope<'a> {
    pub server: &'a Server,
    pub action: AuthType,
    pub sha256: Option<&'a Sha256>,
    pub blob: BlobRef<'a>,
}

impl<'a> ChallengeScope<'a> {
    pub fn new(server: &'a Server, action: AuthType) -> Self {
        Self {
            server,
            action,
            sha256: None,
            blob: BlobRef::None,
        }
    }

    pub fn with_hash(mut self, sha256: &'a Sha256) -> Self {
        self.sha256 = Some(sha256);
        self
    }

    pub fn with_blob(mut self, blob: BlobRef<'a>) -> Self {
        self.blob = blob;
        self
    }
}

/// Credentials attached before the first send
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    authorization: Option<String>,
    payment: Option<String>,
}

impl Credentials {
    pub fn apply(&self, request: &mut HttpRequest) -> BlossomResult<()> {
        if let Some(authorization) = &self.authorization {
            request.set_header(AUTHORIZATION, authorization)?;
        }
        if let Some(payment) = &self.payment {
            request.set_header(headers::CASHU, payment)?;
        }
        Ok(())
    }
}

/// Sends requests for one action and resolves at most one challenge per request
pub struct ChallengeResolver<'a> {
    transport: &'a dyn Transport,
    options: &'a ActionOptions,
}

impl<'a> ChallengeResolver<'a> {
    pub fn new(transport: &'a dyn Transport, options: &'a ActionOptions) -> Self {
        Self { transport, options }
    }

    /// Credentials the first request should carry: preset values, or a
    /// freshly resolved token when auth is `Always`
    pub async fn initial_credentials(&self, scope: &ChallengeScope<'_>) -> BlossomResult<Credentials> {
        let authorization = match &self.options.auth {
            AuthMode::Preset(event) => Some(event.to_authorization_header()?),
            AuthMode::Always => Some(self.authorize(scope).await?.to_authorization_header()?),
            AuthMode::Auto | AuthMode::Disabled => None,
        };
        let payment = self
            .options
            .payment
            .as_ref()
            .map(|proof| proof.as_str().to_string());
        Ok(Credentials {
            authorization,
            payment,
        })
    }

    /// Send one request, racing the cancellation handle and the per-call timeout
    pub async fn send(&self, request: HttpRequest) -> BlossomResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");
        self.guarded(self.transport.send(request)).await
    }

    /// Send `initial`; on a challenge, attach the credential to `retry` and send that once.
    ///
    /// Non-challenge responses are returned as-is so callers can interpret
    /// probe statuses. Use [`execute`](Self::execute) to require success.
    pub async fn resolve(
        &self,
        initial: HttpRequest,
        mut retry: HttpRequest,
        scope: &ChallengeScope<'_>,
    ) -> BlossomResult<Resolution> {
        let response = self.send(initial).await?;

        let challenge = match ResponseClass::of(response.status) {
            ResponseClass::AuthChallenge => {
                debug!(server = %scope.server, status = %response.status, action = %scope.action, "authorization challenge");
                let token = self.authorize(scope).await?;
                retry.set_header(AUTHORIZATION, &token.to_authorization_header()?)?;
                Challenge::Auth
            }
            ResponseClass::PaymentChallenge => {
                debug!(server = %scope.server, "payment challenge");
                let encoded = response.header(headers::CASHU).ok_or_else(|| {
                    BlossomError::protocol(402, "payment required but no X-Cashu request was sent")
                })?;
                let requirement = PaymentRequest::from_header(encoded)?;
                let proof = self.pay(scope, &requirement).await?;
                retry.set_header(headers::CASHU, proof.as_str())?;
                Challenge::Payment
            }
            _ => {
                return Ok(Resolution {
                    response,
                    challenge: None,
                })
            }
        };

        let response = self.send(retry).await?;
        debug!(status = %response.status, ?challenge, "retry answered");
        Ok(Resolution {
            response,
            challenge: Some(challenge),
        })
    }

    /// Resolve `request` and fail on any non-success final response
    pub async fn execute(
        &self,
        request: HttpRequest,
        scope: &ChallengeScope<'_>,
    ) -> BlossomResult<HttpResponse> {
        let resolution = self.resolve(request.clone(), request, scope).await?;
        ensure_success(resolution.response)
    }

    async fn authorize(&self, scope: &ChallengeScope<'_>) -> BlossomResult<SignedEvent> {
        let resolver = match &self.options.auth {
            AuthMode::Disabled => return Err(BlossomError::AuthDisabled),
            AuthMode::Preset(event) => return Ok(event.clone()),
            AuthMode::Auto | AuthMode::Always => self
                .options
                .auth_resolver
                .as_ref()
                .ok_or(BlossomError::MissingHandler(Handler::Auth))?,
        };
        let request = AuthRequest {
            server: scope.server,
            action: scope.action,
            sha256: scope.sha256,
            blob: scope.blob,
        };
        self.guarded(async {
            resolver
                .resolve_auth(request)
                .await
                .map_err(BlossomError::from_resolver)
        })
        .await
    }

    async fn pay(
        &self,
        scope: &ChallengeScope<'_>,
        requirement: &PaymentRequest,
    ) -> BlossomResult<PaymentProof> {
        let resolver = self
            .options
            .payment_resolver
            .as_ref()
            .ok_or(BlossomError::MissingHandler(Handler::Payment))?;
        let context = PaymentContext {
            server: scope.server,
            sha256: scope.sha256,
            blob: scope.blob,
            requirement,
        };
        self.guarded(async {
            resolver
                .resolve_payment(context)
                .await
                .map_err(BlossomError::from_resolver)
        })
        .await
    }

    async fn guarded<T, F>(&self, work: F) -> BlossomResult<T>
    where
        F: Future<Output = BlossomResult<T>>,
    {
        let cancel = &self.options.cancel;
        if cancel.is_cancelled() {
            return Err(BlossomError::Cancelled);
        }
        let limited = async {
            match self.options.timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(BlossomError::Timeout(limit)),
                },
                None => work.await,
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BlossomError::Cancelled),
            result = limited => result,
        }
    }
}

/// Pass 2xx responses through, turn everything else into a protocol error
pub fn ensure_success(response: HttpResponse) -> BlossomResult<HttpResponse> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(protocol_error(&response))
    }
}

/// Protocol error for a failed response.
///
/// Message precedence: `X-Reason` header, JSON `message` field, raw body text.
pub fn protocol_error(response: &HttpResponse) -> BlossomError {
    let from_header = response
        .header(headers::REASON)
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    let message = from_header
        .or_else(|| {
            serde_json::from_slice::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|body| body.get("message")?.as_str().map(str::to_string))
        })
        .or_else(|| {
            let text = response.text();
            (!text.trim().is_empty()).then_some(text)
        })
        .unwrap_or_else(|| {
            response
                .status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    BlossomError::protocol(response.status.as_u16(), message)
}
