use crate::conditions::evaluate;
use crate::error::WorkflowError;
use crate::template::substitute_params;
use crm_application::ActionExecutor;
use crm_core::action::ActionRequest;
use crm_core::auth::AuthContext;
use crm_core::config::WorkflowConfig;
use crm_core::slots::IntentData;
use crm_core::workflow::{
    RunStatus, StepOutcome, StepType, WorkflowDefinition, WorkflowExecutionState,
    WorkflowRepository, WorkflowStep,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Tracing target of thinking events.
pub const THINKING_TARGET: &str = "workflow::thinking";

/// Emits one thinking event for the current run.
macro_rules! think {
    ($state:expr, $phase:expr, $step:expr, $($msg:tt)+) => {
        tracing::info!(
            target: THINKING_TARGET,
            run_id = %$state.run_id,
            workflow_id = %$state.workflow_id,
            phase = $phase,
            step_id = $step,
            $($msg)+
        )
    };
}

/// Executes workflow definitions.
///
/// The engine performs no cycle detection: a step whose edge leads back to
/// itself runs until the optional step limit stops it.
pub struct WorkflowEngine {
    executor: Arc<ActionExecutor>,
    max_steps: Option<usize>,
}

impl WorkflowEngine {
    pub fn new(executor: Arc<ActionExecutor>) -> Self {
        Self {
            executor,
            max_steps: None,
        }
    }

    pub fn from_config(executor: Arc<ActionExecutor>, config: &WorkflowConfig) -> Self {
        Self::new(executor).with_max_steps(config.max_steps)
    }

    /// Caps the number of step visits per run. `None` means unlimited.
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Loads a definition by id and runs it.
    pub async fn run_by_id(
        &self,
        repository: &dyn WorkflowRepository,
        auth: &AuthContext,
        workflow_id: &str,
    ) -> Result<WorkflowExecutionState, WorkflowError> {
        let definition = repository
            .load(workflow_id)
            .await?
            .ok_or_else(|| crm_core::CrmError::not_found("workflow", workflow_id))?;
        self.run(auth, &definition).await
    }

    /// Runs `definition` to completion.
    ///
    /// Only a missing start step is returned as an error; everything that
    /// goes wrong once the run has begun ends in a FAILED state instead.
    pub async fn run(
        &self,
        auth: &AuthContext,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowExecutionState, WorkflowError> {
        if definition.step(&definition.start_step_id).is_none() {
            return Err(WorkflowError::MissingStart {
                workflow_id: definition.id.clone(),
                start_step_id: definition.start_step_id.clone(),
            });
        }

        let mut state = WorkflowExecutionState::new(&definition.id, definition.variables.clone());
        think!(state, "start", definition.start_step_id.as_str(), "starting workflow \"{}\"", definition.name);

        let mut current = definition.start_step_id.clone();
        let mut visits = 0usize;
        loop {
            visits += 1;
            if let Some(limit) = self.max_steps.filter(|limit| visits > *limit) {
                self.fail(&mut state, &current, WorkflowError::StepLimitExceeded(limit).to_string());
                break;
            }

            let Some(step) = definition.step(&current) else {
                // Only reachable through an edge; the start was checked above.
                let from = state.visited.last().cloned().unwrap_or_default();
                let err = WorkflowError::UnknownStep {
                    step_id: from,
                    target: current.clone(),
                };
                self.fail(&mut state, &current, err.to_string());
                break;
            };

            state.current_step_id = Some(step.id.clone());
            state.visited.push(step.id.clone());
            think!(state, "step_start", step.id.as_str(), "step {} ({})", step.id, step.step_type);

            if let Some(condition) = &step.condition {
                let holds = evaluate(condition, &state.condition_scope());
                think!(
                    state,
                    "condition_check",
                    step.id.as_str(),
                    "condition {} {} {} is {}",
                    condition.field,
                    condition.operator,
                    condition.value,
                    holds
                );
                if !holds {
                    match &step.on_error {
                        Some(next) => {
                            current = next.clone();
                            continue;
                        }
                        None => {
                            self.complete(&mut state);
                            break;
                        }
                    }
                }
            }

            let outcome = self.execute_step(auth, &mut state, step).await;
            let success = outcome.success;
            if success {
                if let Some(name) = step.save_as() {
                    state.variables.insert(name.to_string(), outcome.output.clone());
                }
                think!(state, "step_complete", step.id.as_str(), "step {} succeeded", step.id);
            } else {
                think!(
                    state,
                    "error",
                    step.id.as_str(),
                    "step {} failed: {}",
                    step.id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            let error = outcome.error.clone();
            state.step_results.insert(step.id.clone(), outcome);

            let edge = if success { &step.on_success } else { &step.on_error };
            match edge {
                Some(next) => current = next.clone(),
                None if success => {
                    self.complete(&mut state);
                    break;
                }
                None => {
                    let message = error.unwrap_or_else(|| format!("step {} failed", step.id));
                    self.fail(&mut state, &step.id, message);
                    break;
                }
            }
        }

        Ok(state)
    }

    async fn execute_step(
        &self,
        auth: &AuthContext,
        state: &mut WorkflowExecutionState,
        step: &WorkflowStep,
    ) -> StepOutcome {
        think!(state, "step_execute", step.id.as_str(), "executing {}", step.step_type);
        match step.step_type {
            StepType::Action(intent) => {
                let mut params = substitute_params(&step.params, &state.variables);
                params.remove("saveAs");
                let data = match IntentData::from_extracted(intent, &params) {
                    Ok(data) => data,
                    Err(e) => return StepOutcome::failed(e.to_string()),
                };
                let missing = data.missing_fields();
                if !missing.is_empty() {
                    return StepOutcome::failed(format!("missing {}", missing.join(", ")));
                }
                // The workflow author pre-authorizes its mutations.
                match self
                    .executor
                    .execute(auth, ActionRequest::confirmed(data), Some(&state.run_id))
                    .await
                {
                    Ok(outcome) => StepOutcome::ok(json!({
                        "message": outcome.message,
                        "data": outcome.data,
                    })),
                    Err(e) => StepOutcome::failed(e.to_string()),
                }
            }
            StepType::Delay => {
                let millis = step.delay.unwrap_or(0);
                state.status = RunStatus::Paused;
                think!(state, "delay", step.id.as_str(), "waiting {millis} ms");
                tokio::time::sleep(Duration::from_millis(millis)).await;
                state.status = RunStatus::Running;
                StepOutcome::ok(json!({ "delayedMs": millis }))
            }
            StepType::Condition => StepOutcome::ok(Value::Bool(true)),
            StepType::Report => {
                let report = state.results_snapshot();
                think!(state, "report", step.id.as_str(), "report of {} step results", state.step_results.len());
                StepOutcome::ok(report)
            }
        }
    }

    fn complete(&self, state: &mut WorkflowExecutionState) {
        state.status = RunStatus::Completed;
        let last = state.current_step_id.clone().unwrap_or_default();
        think!(state, "complete", last.as_str(), "workflow completed after {} steps", state.visited.len());
    }

    fn fail(&self, state: &mut WorkflowExecutionState, step_id: &str, message: String) {
        tracing::warn!(target: "workflow", run_id = %state.run_id, step_id, error = %message, "workflow failed");
        think!(state, "failed", step_id, "workflow failed: {message}");
        state.status = RunStatus::Failed;
        state.error = Some(message);
    }
}
