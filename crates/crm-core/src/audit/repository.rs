use super::model::ActionLog;
use crate::error::Result;
use async_trait::async_trait;

/// Append-only store of [`ActionLog`] rows.
#[async_trait]
pub trait ActionLogRepository: Send + Sync {
    async fn append(&self, log: &ActionLog) -> Result<()>;

    /// Rows of a workspace in insertion order.
    async fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<ActionLog>>;
}
