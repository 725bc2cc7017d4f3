//! Clients for the external collaborators of the conversation core.
//!
//! - [`HttpIntentOracle`]: the Intent Oracle over HTTP
//! - [`HttpReplyGenerator`]: the Reply Generator over HTTP
//! - [`TemplateReplyGenerator`]: deterministic replies used when no generator
//!   is configured or the remote one fails

pub mod http_oracle;
pub mod http_reply;
pub mod retry;
pub mod template_reply;

pub use http_oracle::HttpIntentOracle;
pub use http_reply::HttpReplyGenerator;
pub use retry::RetryPolicy;
pub use template_reply::TemplateReplyGenerator;

use crm_core::oracle::OracleError;
use reqwest::{StatusCode, header::HeaderValue};
use std::time::Duration;

pub(crate) fn map_transport_error(err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        return OracleError::Timeout;
    }
    OracleError::Transport {
        message: format!("request failed: {err}"),
        retryable: err.is_connect(),
    }
}

/// Maps a non-success status to an [`OracleError`].
///
/// Rate limiting and transient server failures are retryable; client errors
/// (bad request, auth) are not.
pub(crate) fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> OracleError {
    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::REQUEST_TIMEOUT
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or(body);

    OracleError::Http {
        status: status.as_u16(),
        message,
        retryable,
        retry_after,
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date values are not supported.
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
