use crm_core::CrmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The start step is unset or names no step; raised before the run begins.
    #[error("workflow '{workflow_id}' has no start step '{start_step_id}'")]
    MissingStart {
        workflow_id: String,
        start_step_id: String,
    },

    #[error("step '{step_id}' references unknown step '{target}'")]
    UnknownStep { step_id: String, target: String },

    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    #[error("workflow repository error: {0}")]
    Repository(#[from] CrmError),
}
