//! Multi-Intent Splitter.
//!
//! Runs the commands of a bundled utterance strictly in order and stops at the
//! first failure. Earlier side effects stay in place; the aggregate reply lists
//! what completed and why the chain stopped.

use crate::executor::ActionExecutor;
use crm_core::action::{ActionError, ActionOutcome, ActionRequest};
use crm_core::auth::AuthContext;
use crm_core::intent::Intent;
use crm_core::oracle::IntentCandidate;
use crm_core::slots::IntentData;
use std::sync::Arc;

/// Visible separator between the sections of an aggregate reply.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub reply: String,
    pub completed: Vec<ActionOutcome>,
    /// The intent that stopped the chain and the reason.
    pub failed: Option<(Intent, String)>,
}

pub struct MultiIntentSplitter {
    executor: Arc<ActionExecutor>,
}

impl MultiIntentSplitter {
    pub fn new(executor: Arc<ActionExecutor>) -> Self {
        Self { executor }
    }

    pub async fn run(
        &self,
        auth: &AuthContext,
        candidates: &[IntentCandidate],
        origin: Option<&str>,
    ) -> SplitOutcome {
        let mut sections = Vec::new();
        let mut completed = Vec::new();
        let mut failed = None;

        for (index, candidate) in candidates.iter().enumerate() {
            tracing::debug!(target: "conversation", index, intent = %candidate.intent, "running bundled intent");
            match self.run_one(auth, candidate, origin).await {
                Ok(outcome) => {
                    sections.push(outcome.message.clone());
                    completed.push(outcome);
                }
                Err(reason) => {
                    let skipped = candidates.len() - index - 1;
                    let mut section = format!("Stopped at {}: {reason}", candidate.intent);
                    if skipped > 0 {
                        section.push_str(&format!(" ({skipped} more not run)"));
                    }
                    tracing::info!(target: "conversation", intent = %candidate.intent, %reason, skipped, "bundled run halted");
                    sections.push(section);
                    failed = Some((candidate.intent, reason));
                    break;
                }
            }
        }

        SplitOutcome {
            reply: sections.join(SECTION_DELIMITER),
            completed,
            failed,
        }
    }

    async fn run_one(
        &self,
        auth: &AuthContext,
        candidate: &IntentCandidate,
        origin: Option<&str>,
    ) -> Result<ActionOutcome, String> {
        if candidate.intent == Intent::Unknown {
            return Err("the request was not understood".to_string());
        }
        let data = IntentData::from_extracted(candidate.intent, &candidate.extracted_data)
            .map_err(|e| e.to_string())?;
        let missing = data.missing_fields();
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }

        match self.executor.execute(auth, ActionRequest::new(data), origin).await {
            Ok(outcome) => Ok(outcome),
            Err(ActionError::ConfirmationRequired(pending)) => Err(format!(
                "{} needs confirmation; please send it separately",
                pending.description
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}
