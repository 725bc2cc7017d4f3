//! Action request/outcome types and the domain error taxonomy.

mod error;

pub use error::ActionError;

use crate::intent::Intent;
use crate::slots::IntentData;
use serde::{Deserialize, Serialize};

/// One resolved `(intent, data)` pair ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub data: IntentData,
    /// Set once a human approved the pending change.
    #[serde(default)]
    pub confirmed: bool,
}

impl ActionRequest {
    pub fn new(data: IntentData) -> Self {
        Self {
            data,
            confirmed: false,
        }
    }

    pub fn confirmed(data: IntentData) -> Self {
        Self {
            data,
            confirmed: true,
        }
    }

    pub fn intent(&self) -> Intent {
        self.data.intent()
    }
}

/// Successful result of an executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub intent: Intent,
    /// Human-readable result text; the source of truth for reply facts.
    pub message: String,
    /// Structured view of the affected or listed entities.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Number of post-write verification reads it took to observe the write.
    #[serde(default)]
    pub verification_reads: u32,
}

/// A suggested short response surfaced as a clickable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The canned confirm/cancel pair offered for gated mutations.
    pub fn confirm_cancel() -> Vec<QuickReply> {
        vec![
            QuickReply::new("Confirm", "yes").with_color("green"),
            QuickReply::new("Cancel", "no").with_color("red"),
        ]
    }
}

/// A mutation held back until a human confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub intent: Intent,
    /// Description of the change, e.g. `label "VIP": color #3b82f6 -> #f97316`.
    pub description: String,
    pub quick_replies: Vec<QuickReply>,
}

impl PendingConfirmation {
    pub fn new(intent: Intent, description: impl Into<String>) -> Self {
        Self {
            intent,
            description: description.into(),
            quick_replies: QuickReply::confirm_cancel(),
        }
    }
}
