//! Intent Oracle contract.
//!
//! The oracle turns free text plus recent history into a typed classification.
//! Its implementation (an NLU service or LLM) lives outside the core; this
//! module only fixes the request/response shapes and the failure classes.

use crate::intent::Intent;
use crate::session::{Message, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// One prior message passed to the oracle as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Tells the oracle which slot the conversation is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressHint {
    pub intent: Intent,
    pub collected_data: Map<String, Value>,
    pub next_field: Option<String>,
}

/// Classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub utterance: String,
    pub recent_history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_hint: Option<ProgressHint>,
}

/// One intent of a multi-command utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCandidate {
    #[serde(deserialize_with = "lenient_intent")]
    pub intent: Intent,
    #[serde(default)]
    pub extracted_data: Map<String, Value>,
}

/// Classification response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    #[serde(default = "unknown_intent", deserialize_with = "lenient_intent")]
    pub intent: Intent,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub extracted_data: Map<String, Value>,
    #[serde(default)]
    pub should_ask_for_more: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    /// Filled when the utterance bundles several commands.
    #[serde(default)]
    pub multiple_intents: Vec<IntentCandidate>,
}

fn unknown_intent() -> Intent {
    Intent::Unknown
}

fn lenient_intent<'de, D>(deserializer: D) -> Result<Intent, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| Intent::parse_lenient(&s)).unwrap_or(Intent::Unknown))
}

impl OracleResponse {
    /// The degraded response: UNKNOWN with zero confidence and no data.
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            extracted_data: Map::new(),
            should_ask_for_more: false,
            missing_fields: Vec::new(),
            multiple_intents: Vec::new(),
        }
    }

    /// Parses raw oracle output, degrading to [`OracleResponse::unknown`].
    ///
    /// Accepts bare JSON, JSON wrapped in a markdown fence, or JSON embedded
    /// in surrounding prose.
    pub fn parse_lenient(raw: &str) -> Self {
        let Some(candidate) = extract_json_object(raw) else {
            return Self::unknown();
        };
        match serde_json::from_str::<OracleResponse>(candidate) {
            Ok(mut parsed) => {
                if !parsed.confidence.is_finite() {
                    parsed.confidence = 0.0;
                }
                parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
                parsed
            }
            Err(_) => Self::unknown(),
        }
    }

    /// Whether the response carries more than one command.
    pub fn is_multi_intent(&self) -> bool {
        self.multiple_intents.len() > 1
    }
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Failure classes of an oracle (or reply generator) call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retryable: bool,
        retry_after: Option<Duration>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl OracleError {
    /// Only rate-limit and timeout classes are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } | Self::Http { retryable, .. } => *retryable,
            Self::Timeout => true,
            Self::Malformed(_) | Self::NotConfigured(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// External natural-language classifier.
#[async_trait]
pub trait IntentOracle: Send + Sync {
    async fn classify(&self, request: OracleRequest) -> Result<OracleResponse, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"intent\":\"user_create\",\"confidence\":0.92,\"extractedData\":{\"name\":\"Ali\"},\"missingFields\":[\"phone\"]}\n```";
        let parsed = OracleResponse::parse_lenient(raw);
        assert_eq!(parsed.intent, Intent::UserCreate);
        assert_eq!(parsed.missing_fields, vec!["phone"]);
        assert_eq!(parsed.extracted_data.get("name"), Some(&Value::String("Ali".into())));
    }

    #[test]
    fn malformed_output_degrades_to_unknown() {
        for raw in ["not json at all", "{\"intent\": ", "", "{\"confidence\": \"high\"}"] {
            let parsed = OracleResponse::parse_lenient(raw);
            assert_eq!(parsed, OracleResponse::unknown(), "{raw}");
        }
    }

    #[test]
    fn unknown_intent_names_and_confidence_are_sanitized() {
        let parsed = OracleResponse::parse_lenient("{\"intent\":\"FLY\",\"confidence\":7}");
        assert_eq!(parsed.intent, Intent::Unknown);
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn multiple_intents_are_detected() {
        let parsed = OracleResponse::parse_lenient(
            r#"{"intent":"USER_LIST","multipleIntents":[{"intent":"USER_LIST"},{"intent":"GROUP_LIST"}]}"#,
        );
        assert!(parsed.is_multi_intent());
        assert_eq!(parsed.multiple_intents[1].intent, Intent::GroupList);
    }

    #[test]
    fn only_rate_limit_and_timeouts_retry() {
        assert!(OracleError::Timeout.is_retryable());
        let rate_limited = OracleError::Http {
            status: 429,
            message: "slow down".into(),
            retryable: true,
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(2)));
        assert!(!OracleError::Malformed("x".into()).is_retryable());
    }
}
