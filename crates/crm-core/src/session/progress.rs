//! In-flight intent state kept inside a session's context.

use crate::action::PendingConfirmation;
use crate::intent::Intent;
use crate::slots::IntentData;
use serde::{Deserialize, Serialize};

/// Partial state of an incomplete intent.
///
/// Exists only while the intent is incomplete or awaiting confirmation; it is
/// cleared on completion or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Slot data collected so far; also carries the intent.
    pub collected_data: IntentData,
    pub missing_fields: Vec<String>,
    pub next_field: Option<String>,
    /// Set while a gated mutation waits for yes/no.
    #[serde(default)]
    pub pending_confirmation: Option<PendingConfirmation>,
}

impl Progress {
    /// Builds progress for `data`, computing the outstanding fields.
    pub fn collecting(data: IntentData, missing_fields: Vec<String>) -> Self {
        let next_field = missing_fields.first().cloned();
        Self {
            collected_data: data,
            missing_fields,
            next_field,
            pending_confirmation: None,
        }
    }

    /// Builds progress holding a complete mutation that awaits confirmation.
    pub fn confirming(data: IntentData, pending: PendingConfirmation) -> Self {
        Self {
            collected_data: data,
            missing_fields: Vec::new(),
            next_field: None,
            pending_confirmation: Some(pending),
        }
    }

    pub fn intent(&self) -> Intent {
        self.collected_data.intent()
    }

    pub fn state(&self) -> ConversationState {
        if self.pending_confirmation.is_some() {
            ConversationState::Confirming
        } else {
            ConversationState::Collecting
        }
    }
}

/// Observable state of the slot-filling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    /// No progress; the next message starts a fresh intent.
    Idle,
    /// Required fields are still being collected.
    Collecting,
    /// A gated mutation awaits yes/no.
    Confirming,
    /// The resolved action is running.
    Executing,
}
