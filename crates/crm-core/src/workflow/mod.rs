//! Declarative workflow graphs.
//!
//! # Module Structure
//!
//! - `model`: Definition types (`WorkflowDefinition`, `WorkflowStep`, `StepType`, `StepCondition`)
//! - `state`: Per-run state (`WorkflowExecutionState`, `RunStatus`, `StepOutcome`)
//! - `repository`: Load/save boundary for definitions

mod model;
mod repository;
mod state;

pub use model::{ConditionOperator, StepCondition, StepType, WorkflowDefinition, WorkflowStep};
pub use repository::WorkflowRepository;
pub use state::{RunStatus, StepOutcome, WorkflowExecutionState};
