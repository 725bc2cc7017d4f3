//! Intent Oracle over HTTP.
//!
//! POSTs the [`OracleRequest`] as JSON and reads the classification back.
//! Transport failures surface as [`OracleError`]; a reachable service that
//! answers with malformed output degrades to UNKNOWN instead.

use crate::retry::RetryPolicy;
use crate::{map_http_error, map_transport_error, parse_retry_after};
use async_trait::async_trait;
use crm_core::config::OracleConfig;
use crm_core::oracle::{IntentOracle, OracleError, OracleRequest, OracleResponse};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct ClassifyBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(flatten)]
    request: &'a OracleRequest,
}

#[derive(Clone)]
pub struct HttpIntentOracle {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
    retry: RetryPolicy,
}

impl HttpIntentOracle {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| OracleError::NotConfigured("oracle.endpoint is not set".into()))?;
        let mut oracle = Self::new(endpoint, config.timeout())?.with_retry(RetryPolicy::from_config(config));
        oracle.api_key = config.api_key.clone();
        oracle.model = config.model.clone();
        Ok(oracle)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_once(&self, body: &ClassifyBody<'_>) -> Result<OracleResponse, OracleError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read oracle error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let text = response.text().await.map_err(map_transport_error)?;
        let parsed = OracleResponse::parse_lenient(&text);
        if parsed == OracleResponse::unknown() && !text.trim().is_empty() {
            tracing::debug!(target: "oracle", raw = %text, "oracle output degraded to UNKNOWN");
        }
        Ok(parsed)
    }
}

#[async_trait]
impl IntentOracle for HttpIntentOracle {
    async fn classify(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        let body = ClassifyBody {
            model: self.model.as_deref(),
            request: &request,
        };
        let response = self.retry.run("classify", || self.send_once(&body)).await?;
        tracing::debug!(
            target: "oracle",
            intent = %response.intent,
            confidence = response.confidence,
            "classified utterance"
        );
        Ok(response)
    }
}
