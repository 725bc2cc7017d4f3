//! In-memory audit trail.

use async_trait::async_trait;
use crm_core::audit::{ActionLog, ActionLogRepository};
use crm_core::error::Result;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryActionLog {
    rows: RwLock<Vec<ActionLog>>,
}

impl InMemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of every workspace, in insertion order.
    pub async fn all(&self) -> Vec<ActionLog> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl ActionLogRepository for InMemoryActionLog {
    async fn append(&self, log: &ActionLog) -> Result<()> {
        self.rows.write().await.push(log.clone());
        Ok(())
    }

    async fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<ActionLog>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.workspace_id == workspace_id)
            .cloned()
            .collect())
    }
}
