pub mod config_service;
pub mod dir_session_repository;
pub mod memory_action_log;
pub mod memory_directory;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;
pub mod toml_workflow_repository;

pub use crate::config_service::ConfigService;
pub use crate::dir_session_repository::DirSessionRepository;
pub use crate::memory_action_log::InMemoryActionLog;
pub use crate::memory_directory::{DirectorySnapshot, InMemoryDirectory};
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::paths::CrmPaths;
pub use crate::toml_workflow_repository::TomlWorkflowRepository;
