//! Caller authorization context.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of the operator issuing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    /// Elevated roles may run mutating intents.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Opaque authorization context handed to the action executor.
///
/// Only `role` is inspected; the other fields scope data access and audit rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub workspace_id: String,
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            role,
        }
    }
}
