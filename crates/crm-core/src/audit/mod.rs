//! Audit trail of executed actions.

mod model;
mod repository;

pub use model::{ActionLog, ActionStatus};
pub use repository::ActionLogRepository;
