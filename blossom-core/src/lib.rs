//! # blossom-core: Protocol building blocks for Blossom blob clients
//!
//! Blossom stores blobs on plain HTTP servers, addressed by the SHA-256 of
//! their content. Requests may be challenged for a signed capability token
//! (a kind 24242 nostr event) or for a cashu payment.
//!
//! This crate holds everything that does not touch the network:
//!
//! - **Types**: [`Sha256`], [`Server`], [`BlobDescriptor`], [`Payload`], [`PreparedBlob`]
//! - **Capability tokens**: [`AuthType`], [`AuthTemplate`], [`SignedEvent`]
//! - **Payments**: [`PaymentRequest`], [`PaymentProof`]
//! - **Injected capabilities**: [`Signer`], [`HashProvider`], [`AuthResolver`],
//!   [`PaymentResolver`], [`ProgressSink`]
//! - **Errors**: [`BlossomError`] and [`BlossomResult`]
//!
//! The HTTP side (challenge resolution, actions and multi-server uploads)
//! lives in `blossom-client`.
//!
//! ```rust
//! use blossom_core::prelude::*;
//!
//! # fn main() -> BlossomResult<()> {
//! let server = Server::parse("https://cdn.example.com/some/path")?;
//! assert_eq!(server.to_string(), "https://cdn.example.com/");
//!
//! let draft = AuthTemplate::upload(Sha256::of(b"hello")).build(chrono::Utc::now());
//! assert_eq!(draft.kind, AUTH_EVENT_KIND);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod nostr;
pub mod payment;
pub mod resolvers;
pub mod types;

pub use auth::{AuthTemplate, AuthType, EventTemplate, SignedEvent, AUTH_EVENT_KIND};
pub use error::{BlossomError, BlossomResult, Handler};
pub use nostr::{hash_from_url, servers_from_event, SERVER_LIST_KIND};
pub use payment::{PaymentProof, PaymentRequest, CASHU_HEADER};
pub use resolvers::{
    prepare_blob, AuthRequest, AuthResolver, BlobRef, HashProvider, NoopProgress, PaymentContext,
    PaymentResolver, ProgressSink, Sha256Hasher, Signer, SignerAuth,
};
pub use types::{BlobDescriptor, BlobMetadata, Payload, PreparedBlob, Server, Sha256};

/// Convenient imports
pub mod prelude {
    pub use crate::{
        AuthRequest, AuthResolver, AuthTemplate, AuthType, BlobDescriptor, BlobRef,
        BlossomError, BlossomResult, EventTemplate, HashProvider, Payload, PaymentContext,
        PaymentProof, PaymentRequest, PaymentResolver, PreparedBlob, ProgressSink, Server,
        Sha256, Sha256Hasher, SignedEvent, Signer, SignerAuth, AUTH_EVENT_KIND,
    };
}
