use blossom_core::{AuthType, BlossomResult, Server, Sha256};
use http::Method;

use crate::challenge::{ChallengeResolver, ChallengeScope};
use crate::options::ActionOptions;
use crate::transport::{HttpRequest, Transport};

/// Remove a blob with `DELETE /{sha256}`
pub async fn delete_blob(
    transport: &dyn Transport,
    server: &Server,
    sha256: &Sha256,
    options: &ActionOptions,
) -> BlossomResult<bool> {
    let resolver = ChallengeResolver::new(transport, options);
    let scope = ChallengeScope::new(server, AuthType::Delete).with_hash(sha256);

    let mut request = HttpRequest::new(Method::DELETE, server.endpoint(sha256.as_str())?);
    resolver
        .initial_credentials(&scope)
        .await?
        .apply(&mut request)?;

    let response = resolver.execute(request, &scope).await?;
    Ok(response.status.is_success())
}
