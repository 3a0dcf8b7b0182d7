//! Helpers for the nostr side of Blossom: server lists and blob URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::auth::SignedEvent;
use crate::types::{Server, Sha256};

/// Kind of the user server list event
pub const SERVER_LIST_KIND: u32 = 10063;

static SHA256_IN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{64}").expect("valid sha256 pattern"));

/// Servers named by the `server` tags of a kind 10063 event, in tag order.
///
/// Malformed entries are skipped.
pub fn servers_from_event(event: &SignedEvent) -> Vec<Server> {
    event
        .tag_values("server")
        .filter_map(|value| match Server::parse(value) {
            Ok(server) => Some(server),
            Err(err) => {
                debug!(value, error = %err, "skipping malformed server tag");
                None
            }
        })
        .collect()
}

/// The last sha256 digest appearing in a blob URL path
pub fn hash_from_url(url: &str) -> Option<Sha256> {
    let parsed = Url::parse(url).ok()?;
    let last = SHA256_IN_PATH.find_iter(parsed.path()).last()?;
    Sha256::parse(last.as_str()).ok()
}
