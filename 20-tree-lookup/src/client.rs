//! Outbound half of the lookup protocol: asking the parent node.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::protocol::{ErrorResponse, KEY_PARAM, LOOKUP_PATH, LookupRequest, LookupResponse};

#[derive(Debug, Error)]
pub enum ParentError {
    #[error("parent did not answer within {0:?}")]
    Timeout(Duration),

    #[error("parent unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("parent answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("malformed parent reply: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// HTTP client bound to a single parent address.
///
/// Every call is bounded by `timeout`; there is no retry.
#[derive(Debug, Clone)]
pub struct ParentClient {
    http: reqwest::Client,
    addr: String,
    url: String,
    timeout: Duration,
}

impl ParentClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        let addr = addr.into();
        let url = format!("http://{addr}{LOOKUP_PATH}");
        Self {
            http: reqwest::Client::new(),
            addr,
            url,
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `request` to the parent and decodes its answer.
    ///
    /// The key travels as the `value` query parameter and the whole envelope
    /// as the JSON body.
    pub async fn query(&self, request: &LookupRequest) -> Result<LookupResponse, ParentError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[(KEY_PARAM, request.key.as_str())])
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<ErrorResponse>(&body) {
                Ok(reply) => reply.error,
                Err(_) => String::from_utf8_lossy(&body).into_owned(),
            };
            return Err(ParentError::Status { status, message });
        }

        serde_json::from_slice(&body).map_err(ParentError::Malformed)
    }

    fn transport_error(&self, err: reqwest::Error) -> ParentError {
        if err.is_timeout() {
            ParentError::Timeout(self.timeout)
        } else {
            ParentError::Unreachable(err)
        }
    }
}
