//! Workflow Graph Engine.
//!
//! Runs a [`WorkflowDefinition`](crm_core::workflow::WorkflowDefinition) step
//! by step: conditions gate steps, domain actions go through the action
//! executor, `DELAY` suspends only the owning run and `REPORT` snapshots the
//! results so far. Every phase emits a thinking event on the
//! [`THINKING_TARGET`] tracing target; [`ThinkingEventLayer`] turns those into
//! a live stream.

mod conditions;
mod engine;
mod error;
mod template;
pub mod tracing_layer;

pub use engine::{THINKING_TARGET, WorkflowEngine};
pub use error::WorkflowError;
pub use tracing_layer::{ThinkingEvent, ThinkingEventLayer};
