use super::PendingConfirmation;
use crate::error::CrmError;
use thiserror::Error;

/// Domain error taxonomy of an executed action.
///
/// `ConfirmationRequired` is a control-flow signal rather than a failure:
/// callers route it into a confirmation prompt and keep the collected data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// A required field is missing or holds an invalid value.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The identifier did not resolve to an entity of the expected type.
    #[error("No {entity} matches '{identifier}'")]
    NotFound { entity: String, identifier: String },

    /// The requested change equals the current state.
    #[error("{0}")]
    NoOp(String),

    /// The mutation waits for a human yes/no.
    #[error("Confirmation required: {}", .0.description)]
    ConfirmationRequired(PendingConfirmation),

    /// The caller's role may not perform this action.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The write went through but could not be observed afterwards.
    #[error("Changes not applied: {0}")]
    Consistency(String),

    /// The write itself failed.
    #[error("Write failed: {0}")]
    Storage(String),
}

impl ActionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(self, Self::ConfirmationRequired(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Short machine-readable kind, stored with audit rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::NoOp(_) => "no_op",
            Self::ConfirmationRequired(_) => "confirmation_required",
            Self::Unauthorized(_) => "unauthorized",
            Self::Consistency(_) => "consistency",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<CrmError> for ActionError {
    fn from(err: CrmError) -> Self {
        Self::Storage(err.to_string())
    }
}
