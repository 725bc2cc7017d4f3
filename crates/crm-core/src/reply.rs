//! Reply Generator contract.
//!
//! The generator phrases a reply for the operator. It is trusted for phrasing
//! only: callers filter its output against the real action result.

use crate::action::QuickReply;
use crate::intent::Intent;
use crate::oracle::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input for phrasing one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub needs_confirmation: bool,
}

impl ReplyRequest {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            action_result: None,
            error: None,
            missing_fields: Vec::new(),
            needs_confirmation: false,
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.action_result = Some(result.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing_fields = missing;
        self
    }

    pub fn needing_confirmation(mut self) -> Self {
        self.needs_confirmation = true;
        self
    }
}

/// Generated reply text and suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReply {
    pub reply: String,
    #[serde(default)]
    pub quick_replies: Vec<QuickReply>,
}

impl GeneratedReply {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            quick_replies: Vec::new(),
        }
    }
}

/// External reply phraser.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, request: ReplyRequest) -> Result<GeneratedReply, OracleError>;
}
