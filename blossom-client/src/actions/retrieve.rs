use blossom_core::{AuthType, BlobDescriptor, BlossomResult, Server, Sha256};
use bytes::Bytes;
use http::Method;

use crate::challenge::{protocol_error, ChallengeResolver, ChallengeScope, ResponseClass};
use crate::options::ActionOptions;
use crate::transport::{HttpRequest, Transport};

/// Optional time range for `GET /list/{pubkey}` (unix seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub since: Option<i64>,
    pub until: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: i64) -> Self {
        self.until = Some(until);
        self
    }
}

/// Fetch blob content with `GET /{sha256}`
pub async fn download_blob(
    transport: &dyn Transport,
    server: &Server,
    sha256: &Sha256,
    options: &ActionOptions,
) -> BlossomResult<Bytes> {
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, AuthType::Get).with_hash(sha256);

    let mut request = HttpRequest::new(Method::GET, server.endpoint(sha256.as_str())?);
    resolver
        .initial_credentials(&scope)
        .await?
        .apply(&mut request)?;

    Ok(resolver.execute(request, &scope).await?.body)
}

/// Check for a blob with `HEAD /{sha256}`; 404 means absent
pub async fn has_blob(
    transport: &dyn Transport,
    server: &Server,
    sha256: &Sha256,
    options: &ActionOptions,
) -> BlossomResult<bool> {
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, AuthType::Get).with_hash(sha256);

    let mut request = HttpRequest::new(Method::HEAD, server.endpoint(sha256.as_str())?);
    resolver
        .initial_credentials(&scope)
        .await?
        .apply(&mut request)?;

    let resolution = resolver.resolve(request.clone(), request, &scope).await?;
    match ResponseClass::of(resolution.response.status) {
        ResponseClass::Success => Ok(true),
        ResponseClass::NotFound => Ok(false),
        _ => Err(protocol_error(&resolution.response)),
    }
}

/// List descriptors uploaded by `pubkey` with `GET /list/{pubkey}`
pub async fn list_blobs(
    transport: &dyn Transport,
    server: &Server,
    pubkey: &str,
    query: ListQuery,
    options: &ActionOptions,
) -> BlossomResult<Vec<BlobDescriptor>> {
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, AuthType::List);

    let mut url = server.endpoint(&format!("list/{pubkey}"))?;
    if query.since.is_some() || query.until.is_some() {
        let mut pairs = url.query_pairs_mut();
        if let Some(since) = query.since {
            pairs.append_pair("since", &since.to_string());
        }
        if let Some(until) = query.until {
            pairs.append_pair("until", &until.to_string());
        }
    }

    let mut request = HttpRequest::new(Method::GET, url);
    resolver
        .initial_credentials(&scope)
        .await?
        .apply(&mut request)?;

    resolver.execute(request, &scope).await?.json()
}
