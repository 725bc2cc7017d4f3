//! Workflow definition types.
//!
//! Definitions are authored outside the system and loaded by id. Steps link
//! to each other through `onSuccess`/`onError` edges; an absent edge is
//! terminal. Cycles are permitted and not detected.

use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

/// What a step does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepType {
    /// Runs a domain action through the action executor.
    Action(Intent),
    /// Suspends the run for `delay` milliseconds.
    Delay,
    /// Only evaluates its condition.
    Condition,
    /// Snapshots the step results collected so far.
    Report,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepType::Action(intent) => write!(f, "{intent}"),
            StepType::Delay => write!(f, "DELAY"),
            StepType::Condition => write!(f, "CONDITION"),
            StepType::Report => write!(f, "REPORT"),
        }
    }
}

impl TryFrom<String> for StepType {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.trim().to_uppercase().as_str() {
            "DELAY" => Ok(StepType::Delay),
            "CONDITION" => Ok(StepType::Condition),
            "REPORT" => Ok(StepType::Report),
            other => match Intent::from_str(other) {
                Ok(Intent::Unknown) | Err(_) => Err(format!("unknown step type '{raw}'")),
                Ok(intent) => Ok(StepType::Action(intent)),
            },
        }
    }
}

impl From<StepType> for String {
    fn from(step_type: StepType) -> Self {
        step_type.to_string()
    }
}

/// Comparison used by a step condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
}

/// Guard evaluated before a step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCondition {
    /// Variable name or dotted path into step results (`stepId.output`).
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

/// One node of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Milliseconds, for `DELAY` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, step_type: StepType) -> Self {
        Self {
            id: id.into(),
            step_type,
            delay: None,
            on_success: None,
            on_error: None,
            params: Map::new(),
            condition: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Some(millis);
        self
    }

    pub fn on_success(mut self, step_id: impl Into<String>) -> Self {
        self.on_success = Some(step_id.into());
        self
    }

    pub fn on_error(mut self, step_id: impl Into<String>) -> Self {
        self.on_error = Some(step_id.into());
        self
    }

    /// Name under which the step's output is bound into `variables`.
    pub fn save_as(&self) -> Option<&str> {
        self.params.get("saveAs").and_then(Value::as_str)
    }
}

/// A declarative step graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start_step_id: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_step_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            start_step_id: start_step_id.into(),
            variables: Map::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Edges pointing at step ids that do not exist, as `(from, to)` pairs.
    pub fn dangling_edges(&self) -> Vec<(String, String)> {
        self.steps
            .iter()
            .flat_map(|s| [&s.on_success, &s.on_error].into_iter().flatten().map(move |to| (s, to)))
            .filter(|(_, to)| self.step(to).is_none())
            .map(|(s, to)| (s.id.clone(), to.clone()))
            .collect()
    }
}
