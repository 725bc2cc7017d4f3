//! TOML-backed workflow definition repository.
//!
//! Each definition lives in its own `<id>.toml` document inside one
//! directory. Saves are atomic and serialized through a file lock.

use crate::paths::CrmPaths;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use crm_core::error::{CrmError, Result};
use crm_core::workflow::{WorkflowDefinition, WorkflowRepository};
use std::path::{Path, PathBuf};

pub struct TomlWorkflowRepository {
    dir: PathBuf,
}

impl TomlWorkflowRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Repository rooted at `~/.config/crm-agent/workflows`.
    pub fn default_location() -> Result<Self> {
        let dir = CrmPaths::workflows_dir().map_err(|e| CrmError::config(e.to_string()))?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document(&self, workflow_id: &str) -> Result<AtomicTomlFile<WorkflowDefinition>> {
        let valid = !workflow_id.is_empty()
            && workflow_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CrmError::data_access(format!(
                "invalid workflow id '{workflow_id}'"
            )));
        }
        Ok(AtomicTomlFile::new(self.dir.join(format!("{workflow_id}.toml"))))
    }
}

#[async_trait]
impl WorkflowRepository for TomlWorkflowRepository {
    async fn load(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>> {
        let document = self.document(workflow_id)?;
        tokio::task::spawn_blocking(move || document.load())
            .await
            .map_err(|e| CrmError::internal(format!("workflow load task failed: {e}")))?
            .map_err(CrmError::from)
    }

    async fn save(&self, definition: &WorkflowDefinition) -> Result<()> {
        let document = self.document(&definition.id)?;
        let definition = definition.clone();
        tokio::task::spawn_blocking(move || document.save_locked(&definition))
            .await
            .map_err(|e| CrmError::internal(format!("workflow save task failed: {e}")))??;
        tracing::debug!(target: "workflow", dir = %self.dir.display(), "saved workflow definition");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WorkflowDefinition>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut definitions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_toml = path.extension().is_some_and(|ext| ext == "toml");
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).filter(|_| is_toml) else {
                continue;
            };
            match self.load(id).await {
                Ok(Some(definition)) => definitions.push(definition),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "workflow", path = %path.display(), error = %e, "skipping unreadable workflow file");
                }
            }
        }
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::intent::Intent;
    use crm_core::workflow::{ConditionOperator, StepCondition, StepType, WorkflowStep};
    use serde_json::json;
    use tempfile::TempDir;

    fn onboarding() -> WorkflowDefinition {
        WorkflowDefinition::new("onboard", "Onboard contact", "create")
            .with_variable("who", json!("Ali"))
            .with_step(
                WorkflowStep::new("create", StepType::Action(Intent::UserCreate))
                    .with_param("name", json!("${who}"))
                    .with_param("phone", json!("09120000000"))
                    .with_param("saveAs", json!("created"))
                    .on_success("check"),
            )
            .with_step(
                WorkflowStep::new("check", StepType::Condition)
                    .with_condition(StepCondition {
                        field: "created".into(),
                        operator: ConditionOperator::Exists,
                        value: serde_json::Value::Null,
                    })
                    .on_success("wait")
                    .on_error("report"),
            )
            .with_step(WorkflowStep::new("wait", StepType::Delay).with_delay(5).on_success("report"))
            .with_step(WorkflowStep::new("report", StepType::Report))
    }

    #[tokio::test]
    async fn save_then_load_keeps_the_graph() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlWorkflowRepository::new(temp_dir.path());
        let definition = onboarding();

        repo.save(&definition).await.unwrap();
        let loaded = repo.load("onboard").await.unwrap().unwrap();

        assert_eq!(loaded, definition);
        assert!(temp_dir.path().join("onboard.toml").exists());
    }

    #[tokio::test]
    async fn missing_definition_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlWorkflowRepository::new(temp_dir.path());
        assert!(repo.load("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_skips_foreign_and_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlWorkflowRepository::new(temp_dir.path());
        repo.save(&onboarding()).await.unwrap();
        repo.save(&WorkflowDefinition::new("audit", "Audit", "report")
            .with_step(WorkflowStep::new("report", StepType::Report)))
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(temp_dir.path().join("broken.toml"), "id = ").unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["audit".to_string(), "onboard".to_string()]);
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlWorkflowRepository::new(temp_dir.path().join("none"));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_like_ids_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlWorkflowRepository::new(temp_dir.path());
        assert!(repo.load("../escape").await.is_err());
    }
}
