//! Wire format of the lookup endpoint.
//!
//! Requests are `GET /?value=<key>` with an optional JSON body naming the
//! requester; responses are a JSON object naming the node that answered.
//! Field names follow the existing wire contract (`SonURL`, `URL`, `Value`).
//! `Hops` and `Found` extend it: the first bounds how far a lookup may
//! travel, the second tells a stored empty string apart from a miss.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the single lookup endpoint.
pub const LOOKUP_PATH: &str = "/";

/// Query parameter carrying the key to look up.
pub const KEY_PARAM: &str = "value";

/// Lookup envelope sent by a child (or any external caller).
///
/// `key` mirrors the query parameter; the query parameter is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Address of the node that will receive the answer. Used for tracing only.
    #[serde(rename = "SonURL", default)]
    pub requester: String,
    #[serde(rename = "Value", default)]
    pub key: String,
    /// Number of escalations this lookup has already gone through.
    #[serde(rename = "Hops", default)]
    pub hops: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Address of the node that produced this response.
    #[serde(rename = "URL")]
    pub answering: String,
    /// Resolved value, empty when `found` is false.
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Found")]
    pub found: bool,
}

impl LookupResponse {
    pub fn hit(answering: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            answering: answering.into(),
            value: value.into(),
            found: true,
        }
    }

    pub fn miss(answering: impl Into<String>) -> Self {
        Self {
            answering: answering.into(),
            value: String::new(),
            found: false,
        }
    }
}

/// Body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("missing required query parameter 'value'")]
    MissingKey,

    #[error("query parameter 'value' must appear exactly once")]
    DuplicateKey,

    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Builds a [`LookupRequest`] from the decoded query pairs and the raw body.
///
/// The key is taken from the `value` query parameter, which must be present
/// exactly once and non-empty. An empty or whitespace-only body is treated as
/// an anonymous request with zero hops.
pub fn decode_request(
    query: &[(String, String)],
    body: &[u8],
) -> Result<LookupRequest, RequestError> {
    let mut keys = query
        .iter()
        .filter(|(name, _)| name == KEY_PARAM)
        .map(|(_, value)| value);

    let key = match (keys.next(), keys.next()) {
        (Some(key), None) if !key.is_empty() => key.clone(),
        (Some(_), Some(_)) => return Err(RequestError::DuplicateKey),
        _ => return Err(RequestError::MissingKey),
    };

    let mut request = if body.iter().all(u8::is_ascii_whitespace) {
        LookupRequest::default()
    } else {
        serde_json::from_slice::<LookupRequest>(body)?
    };

    if !request.key.is_empty() && request.key != key {
        tracing::debug!(body_key = %request.key, %key, "body key differs from query key");
    }
    request.key = key;

    Ok(request)
}
