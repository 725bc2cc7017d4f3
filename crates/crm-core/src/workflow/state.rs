//! Transient per-run workflow state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Status of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    /// Suspended inside a `DELAY` step.
    Paused,
}

/// Recorded outcome of an executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Mutable state of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionState {
    pub run_id: String,
    pub workflow_id: String,
    pub current_step_id: Option<String>,
    pub variables: Map<String, Value>,
    /// Outcomes keyed by step id; steps skipped by a false condition are absent.
    pub step_results: HashMap<String, StepOutcome>,
    /// Step ids in the order they were visited, including skipped ones.
    pub visited: Vec<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowExecutionState {
    pub fn new(workflow_id: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            current_step_id: None,
            variables,
            step_results: HashMap::new(),
            visited: Vec::new(),
            status: RunStatus::Running,
            error: None,
        }
    }

    /// JSON snapshot of recorded step results.
    pub fn results_snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .step_results
            .iter()
            .map(|(id, outcome)| (id.clone(), serde_json::to_value(outcome).unwrap_or(Value::Null)))
            .collect();
        Value::Object(map)
    }

    /// Variables merged with step results, as seen by step conditions.
    ///
    /// Step results are keyed by step id; a variable wins on a name clash.
    pub fn condition_scope(&self) -> Map<String, Value> {
        let mut scope = match self.results_snapshot() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (name, value) in &self.variables {
            scope.insert(name.clone(), value.clone());
        }
        scope
    }
}
