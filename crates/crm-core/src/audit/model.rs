use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded for an action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// One append-only audit row per executed action attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: String,
    pub workspace_id: String,
    /// Operator that issued the action.
    pub actor_id: String,
    /// Chat session or workflow run the attempt belongs to.
    #[serde(default)]
    pub session_id: Option<String>,
    pub action_type: Intent,
    pub status: ActionStatus,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActionLog {
    pub fn success(
        workspace_id: impl Into<String>,
        actor_id: impl Into<String>,
        session_id: Option<String>,
        action_type: Intent,
        payload: serde_json::Value,
        result: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            actor_id: actor_id.into(),
            session_id,
            action_type,
            status: ActionStatus::Success,
            payload,
            result: Some(result.into()),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        workspace_id: impl Into<String>,
        actor_id: impl Into<String>,
        session_id: Option<String>,
        action_type: Intent,
        payload: serde_json::Value,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            actor_id: actor_id.into(),
            session_id,
            action_type,
            status: ActionStatus::Failed,
            payload,
            result: None,
            error_message: Some(error_message.into()),
            created_at: Utc::now(),
        }
    }
}
