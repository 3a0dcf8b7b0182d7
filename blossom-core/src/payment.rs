use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlossomError, BlossomResult};

/// Header carrying cashu payment requests (402 responses) and proofs (retries)
pub const CASHU_HEADER: &str = "x-cashu";

/// Payment requirement issued by a server with a 402 response.
///
/// Fields follow the cashu NUT-18 JSON layout. Requests that cannot be
/// decoded are still passed along through `encoded` so a payment resolver
/// can handle formats this crate does not parse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub single_use: Option<bool>,
    #[serde(rename = "m", default, skip_serializing_if = "Vec::is_empty")]
    pub mints: Vec<String>,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "t", default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<serde_json::Value>,
    /// Header value exactly as the server sent it
    #[serde(skip)]
    pub encoded: String,
}

impl PaymentRequest {
    /// Decode the `X-Cashu` header of a 402 response
    pub fn from_header(value: &str) -> BlossomResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(BlossomError::protocol(402, "empty X-Cashu payment request"));
        }
        let body = value.strip_prefix("creqA").unwrap_or(value);
        let decoded = STANDARD
            .decode(body)
            .or_else(|_| URL_SAFE.decode(body))
            .or_else(|_| URL_SAFE_NO_PAD.decode(body))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<PaymentRequest>(&bytes).ok());

        let mut request = decoded.unwrap_or_else(|| {
            debug!("payment request is not base64 json, passing it through verbatim");
            PaymentRequest::default()
        });
        request.encoded = value.to_string();
        Ok(request)
    }
}

/// Encoded cashu token sent back in the `X-Cashu` header
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentProof(String);

impl PaymentProof {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PaymentProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PaymentProof(..)")
    }
}
