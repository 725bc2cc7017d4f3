//! Reply Generator over HTTP.

use crate::{map_http_error, map_transport_error, parse_retry_after};
use async_trait::async_trait;
use crm_core::config::ReplyConfig;
use crm_core::oracle::OracleError;
use crm_core::reply::{GeneratedReply, ReplyGenerator, ReplyRequest};
use reqwest::Client;
use std::time::Duration;

/// Phrases replies through a remote service.
///
/// Not retried: a failed call falls back to a template reply immediately.
#[derive(Clone)]
pub struct HttpReplyGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpReplyGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Builds a generator when `reply.endpoint` is set.
    pub fn from_config(config: &ReplyConfig) -> Result<Option<Self>, OracleError> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };
        let mut generator = Self::new(endpoint, Duration::from_secs(config.timeout_secs))?;
        generator.api_key = config.api_key.clone();
        Ok(Some(generator))
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate(&self, request: ReplyRequest) -> Result<GeneratedReply, OracleError> {
        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body, retry_after));
        }

        let text = response.text().await.map_err(map_transport_error)?;
        let reply: GeneratedReply = serde_json::from_str(text.trim())
            .map_err(|e| OracleError::Malformed(format!("reply generator output: {e}")))?;
        if reply.reply.trim().is_empty() {
            return Err(OracleError::Malformed("empty reply".into()));
        }
        Ok(reply)
    }
}
