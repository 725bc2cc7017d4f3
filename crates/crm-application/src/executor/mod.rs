//! Action Executor.
//!
//! Executes one resolved `(intent, data)` pair against the workspace
//! directory. Every attempt that actually runs is written to the audit trail
//! (SUCCESS or FAILED); a confirmation request is a control-flow signal and
//! leaves no row behind.

mod groups;
mod labels;
mod queries;
mod resolve;
mod users;
mod verify;

pub use verify::VerificationPolicy;

use crm_core::action::{ActionError, ActionOutcome, ActionRequest};
use crm_core::audit::{ActionLog, ActionLogRepository};
use crm_core::auth::AuthContext;
use crm_core::directory::{DirectoryStore, DirectoryTransaction};
use crm_core::intent::Intent;
use crm_core::slots::{IntentData, validate};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use verify::{Expected, verify_committed};

pub struct ActionExecutor {
    directory: Arc<dyn DirectoryStore>,
    audit: Arc<dyn ActionLogRepository>,
    verification: VerificationPolicy,
}

impl ActionExecutor {
    pub fn new(directory: Arc<dyn DirectoryStore>, audit: Arc<dyn ActionLogRepository>) -> Self {
        Self {
            directory,
            audit,
            verification: VerificationPolicy::default(),
        }
    }

    pub fn with_verification(mut self, verification: VerificationPolicy) -> Self {
        self.verification = verification;
        self
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryStore> {
        &self.directory
    }

    /// Executes `request` on behalf of `auth`.
    ///
    /// `origin` names the chat session or workflow run the attempt belongs to
    /// and is stored with the audit row.
    pub async fn execute(
        &self,
        auth: &AuthContext,
        request: ActionRequest,
        origin: Option<&str>,
    ) -> Result<ActionOutcome, ActionError> {
        let intent = request.intent();
        let result = self.dispatch(auth, &request).await;

        let mut payload = request.data.fields_json();
        payload.insert("confirmed".to_string(), Value::Bool(request.confirmed));
        let payload = Value::Object(payload);
        let origin = origin.map(str::to_string);

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    target: "executor",
                    intent = %intent,
                    workspace_id = %auth.workspace_id,
                    verification_reads = outcome.verification_reads,
                    "action succeeded"
                );
                self.record(ActionLog::success(
                    &auth.workspace_id,
                    &auth.user_id,
                    origin,
                    intent,
                    payload,
                    &outcome.message,
                ))
                .await;
            }
            Err(ActionError::ConfirmationRequired(pending)) => {
                tracing::debug!(target: "executor", intent = %intent, change = %pending.description, "confirmation required");
            }
            Err(err) => {
                tracing::warn!(target: "executor", intent = %intent, kind = err.kind(), error = %err, "action failed");
                self.record(ActionLog::failure(
                    &auth.workspace_id,
                    &auth.user_id,
                    origin,
                    intent,
                    payload,
                    err.to_string(),
                ))
                .await;
            }
        }
        result
    }

    async fn record(&self, log: ActionLog) {
        if let Err(e) = self.audit.append(&log).await {
            tracing::error!(target: "executor", error = %e, action_type = %log.action_type, "failed to write audit row");
        }
    }

    async fn dispatch(
        &self,
        auth: &AuthContext,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, ActionError> {
        let intent = request.intent();
        if intent.is_mutation() && !auth.role.is_elevated() {
            return Err(ActionError::Unauthorized(format!(
                "role '{}' may not run {}",
                auth.role, intent
            )));
        }
        if let Some(field) = validate(&request.data, request.confirmed).into_iter().next() {
            return Err(ActionError::validation(field, "is required"));
        }

        let ws = auth.workspace_id.as_str();
        let confirmed = request.confirmed;
        match &request.data {
            IntentData::UserList(f) => self.list_users(ws, f).await,
            IntentData::UserGet(f) => self.get_user(ws, f).await,
            IntentData::LabelList(f) => self.list_labels(ws, f).await,
            IntentData::GroupList(f) => self.list_groups(ws, f).await,
            IntentData::UserCreate(f) => self.create_user(ws, f).await,
            IntentData::UserUpdate(f) => self.update_user(ws, f, confirmed).await,
            IntentData::UserDelete(f) => self.delete_user(ws, f, confirmed).await,
            IntentData::UserSetLabels(f) => self.set_user_labels(ws, f).await,
            IntentData::LabelCreate(f) => self.create_label(ws, f).await,
            IntentData::LabelUpdate(f) => self.update_label(ws, f, confirmed).await,
            IntentData::LabelDelete(f) => self.delete_label(ws, f, confirmed).await,
            IntentData::GroupCreate(f) => self.create_group(ws, f).await,
            IntentData::GroupUpdate(f) => self.update_group(ws, f, confirmed).await,
            IntentData::GroupDelete(f) => self.delete_group(ws, f, confirmed).await,
            IntentData::GroupAddMember(f) => self.add_member(ws, f).await,
            IntentData::GroupRemoveMember(f) => self.remove_member(ws, f).await,
            IntentData::Unknown => Err(ActionError::validation(
                "intent",
                "the request was not understood",
            )),
        }
    }

    /// Commits, then reads the committed state back until it matches.
    async fn commit_and_verify(
        &self,
        workspace_id: &str,
        tx: Box<dyn DirectoryTransaction>,
        expected: Expected,
        intent: Intent,
        message: String,
        data: Value,
    ) -> Result<ActionOutcome, ActionError> {
        tx.commit().await?;
        let verification_reads =
            verify_committed(self.directory.as_ref(), workspace_id, &expected, &self.verification)
                .await?;
        Ok(ActionOutcome {
            intent,
            message,
            data,
            verification_reads,
        })
    }

    /// Verifies inside the transaction, commits, then reads the committed
    /// state back like any other mutation.
    ///
    /// Used for relational set changes and deletes. A mismatch inside the
    /// transaction drops it uncommitted; the post-commit reads catch writes
    /// that were lost or have not propagated yet.
    async fn verify_and_commit(
        &self,
        workspace_id: &str,
        tx: Box<dyn DirectoryTransaction>,
        expected: Expected,
        intent: Intent,
        message: String,
        data: Value,
    ) -> Result<ActionOutcome, ActionError> {
        if !expected.holds(tx.as_ref()).await? {
            tracing::error!(target: "verification", "in-transaction read does not match the write");
            return Err(ActionError::Consistency(format!(
                "{} did not match after writing",
                expected.describe()
            )));
        }
        self.commit_and_verify(workspace_id, tx, expected, intent, message, data)
            .await
    }
}

pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ActionError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ActionError::validation(field, "is required"))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub(crate) fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(none)")
}
