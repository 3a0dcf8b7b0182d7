use blossom_core::{AuthType, BlobDescriptor, BlobRef, BlossomResult, Server};
use http::header::CONTENT_TYPE;
use http::Method;
use serde::Serialize;

use crate::challenge::{ChallengeResolver, ChallengeScope};
use crate::options::ActionOptions;
use crate::transport::{headers, HttpRequest, Transport};

#[derive(Serialize)]
struct MirrorBody<'a> {
    url: &'a str,
}

/// Ask `server` to fetch `blob` from its current URL with `PUT /mirror`.
///
/// Authorized with an `upload` token.
pub async fn mirror_blob(
    transport: &dyn Transport,
    server: &Server,
    blob: &BlobDescriptor,
    options: &ActionOptions,
) -> BlossomResult<BlobDescriptor> {
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, AuthType::Upload)
        .with_hash(&blob.sha256)
        .with_blob(BlobRef::Descriptor(blob));

    let body = serde_json::to_vec(&MirrorBody { url: &blob.url })?;
    let mut request = HttpRequest::new(Method::PUT, server.endpoint("mirror")?).with_body(body);
    request.set_header(CONTENT_TYPE, "application/json")?;
    request.set_header(headers::SHA256, blob.sha256.as_str())?;
    request.set_header(headers::CONTENT_LENGTH, &blob.size.to_string())?;
    if let Some(mime) = &blob.mime_type {
        request.set_header(headers::CONTENT_TYPE, mime)?;
    }
    resolver
        .initial_credentials(&scope)
        .await?
        .apply(&mut request)?;

    resolver.execute(request, &scope).await?.json()
}
