//! # blossom-client: Talk to Blossom blob servers
//!
//! Every action (upload, media upload, mirror, download, existence check,
//! list, delete) goes through one challenge state machine that answers a
//! 401/403 with a capability token or a 402 with a payment proof, retrying
//! exactly once.
//!
//! On top of that, [`MultiServerUpload`] drives one blob to many servers:
//!
//! ```text
//! ┌──────────────────────┐
//! │  MultiServerUpload   │  ← media phase, mirror-or-upload fallback, auth cache
//! ├──────────────────────┤
//! │  actions::*          │  ← per-action requests and capability probes
//! ├──────────────────────┤
//! │  ChallengeResolver   │  ← 401/403/402 handling, timeout, cancellation
//! ├──────────────────────┤
//! │  Transport           │  ← reqwest, or anything else
//! └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blossom_client::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(signer: impl Signer + 'static) -> BlossomResult<()> {
//! let client = BlossomClient::new().with_signer(signer);
//! let servers = vec![
//!     Server::parse("https://cdn.one.example")?,
//!     Server::parse("https://cdn.two.example")?,
//! ];
//!
//! let result = client
//!     .multi_server(MultiServerConfig::default())
//!     .upload(&servers, Payload::new(&b"hello"[..]), CancellationToken::new())
//!     .await?;
//!
//! for (server, descriptor) in result.iter() {
//!     println!("{server} -> {}", descriptor.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
mod auth_cache;
pub mod challenge;
mod client;
pub mod config;
pub mod options;
pub mod orchestrator;
pub mod transport;

pub use auth_cache::AuthCache;
pub use challenge::{ChallengeResolver, ChallengeScope, ResponseClass};
pub use client::BlossomClient;
pub use config::{MediaPolicy, MultiServerConfig};
pub use options::{ActionOptions, AuthMode};
pub use orchestrator::{Delivery, MultiServerUpload, OrchestrationResult, ServerState};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub use blossom_core;

/// Convenient imports
pub mod prelude {
    pub use crate::actions::ListQuery;
    pub use crate::{
        ActionOptions, AuthMode, BlossomClient, Delivery, MediaPolicy, MultiServerConfig,
        MultiServerUpload, OrchestrationResult, Transport,
    };
    pub use blossom_core::prelude::*;
}
