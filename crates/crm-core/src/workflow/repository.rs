use super::model::WorkflowDefinition;
use crate::error::Result;
use async_trait::async_trait;

/// Load/save boundary for workflow definitions.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn load(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>>;

    async fn save(&self, definition: &WorkflowDefinition) -> Result<()>;

    async fn list(&self) -> Result<Vec<WorkflowDefinition>>;
}
