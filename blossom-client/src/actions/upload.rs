use blossom_core::{
    AuthType, BlobDescriptor, BlobRef, BlossomError, BlossomResult, PreparedBlob, Server,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tracing::{debug, warn};

use crate::challenge::{ensure_success, protocol_error, ChallengeResolver, ChallengeScope, ResponseClass};
use crate::options::ActionOptions;
use crate::transport::{headers, HttpRequest, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Upload,
    Media,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Upload => "upload",
            Endpoint::Media => "media",
        }
    }

    fn auth_type(self) -> AuthType {
        match self {
            Endpoint::Upload => AuthType::Upload,
            Endpoint::Media => AuthType::Media,
        }
    }
}

/// Upload raw content with `PUT /upload`, probing with `HEAD /upload` first
pub async fn upload_blob(
    transport: &dyn Transport,
    server: &Server,
    blob: &PreparedBlob,
    options: &ActionOptions,
) -> BlossomResult<BlobDescriptor> {
    let descriptor = put_content(transport, server, blob, Endpoint::Upload, options).await?;
    if descriptor.sha256 != *blob.sha256() {
        warn!(server = %server, expected = %blob.sha256(), returned = %descriptor.sha256, "server reported a different hash");
    }
    Ok(descriptor)
}

/// Upload content for server-side processing with `PUT /media`.
///
/// Fails with [`BlossomError::MediaUnsupported`] when the probe answers 404.
pub async fn upload_media(
    transport: &dyn Transport,
    server: &Server,
    blob: &PreparedBlob,
    options: &ActionOptions,
) -> BlossomResult<BlobDescriptor> {
    put_content(transport, server, blob, Endpoint::Media, options).await
}

async fn put_content(
    transport: &dyn Transport,
    server: &Server,
    blob: &PreparedBlob,
    endpoint: Endpoint,
    options: &ActionOptions,
) -> BlossomResult<BlobDescriptor> {
    let url = server.endpoint(endpoint.path())?;
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, endpoint.auth_type())
        .with_hash(blob.sha256())
        .with_blob(BlobRef::Payload(blob));
    let credentials = resolver.initial_credentials(&scope).await?;

    let mut probe = HttpRequest::new(Method::HEAD, url.clone());
    probe.set_header(headers::SHA256, blob.sha256().as_str())?;
    probe.set_header(headers::CONTENT_LENGTH, &blob.size().to_string())?;
    if let Some(mime) = blob.mime_type() {
        probe.set_header(headers::CONTENT_TYPE, mime)?;
    }
    credentials.apply(&mut probe)?;

    let mut put = HttpRequest::new(Method::PUT, url).with_body(blob.bytes().clone());
    put.set_header(headers::SHA256, blob.sha256().as_str())?;
    if let Some(mime) = blob.mime_type() {
        put.set_header(CONTENT_TYPE, mime)?;
    }
    credentials.apply(&mut put)?;

    let probed = resolver.resolve(probe, put.clone(), &scope).await?;
    let response = if probed.challenge.is_some() {
        // the retry already carried the body
        probed.response
    } else {
        match ResponseClass::of(probed.response.status) {
            ResponseClass::Success => resolver.resolve(put.clone(), put, &scope).await?.response,
            ResponseClass::NotFound if endpoint == Endpoint::Media => {
                debug!(server = %server, "media endpoint missing");
                return Err(BlossomError::MediaUnsupported {
                    server: server.to_string(),
                });
            }
            ResponseClass::NotFound => {
                debug!(server = %server, "upload probe unsupported, sending content directly");
                resolver.resolve(put.clone(), put, &scope).await?.response
            }
            _ => return Err(protocol_error(&probed.response)),
        }
    };

    let response = ensure_success(response)?;
    let descriptor: BlobDescriptor = response.json()?;
    debug!(server = %server, sha256 = %descriptor.sha256, url = %descriptor.url, "content accepted");
    Ok(descriptor)
}
