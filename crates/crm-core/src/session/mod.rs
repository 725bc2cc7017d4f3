//! Session domain module.
//!
//! This module contains the chat session model, the per-session slot-filling
//! progress, the message log and the repository interface.
//!
//! # Module Structure
//!
//! - `model`: Core session model (`Session`, `SessionStatus`, `SessionContext`)
//! - `progress`: In-flight intent state (`Progress`, `ConversationState`)
//! - `message`: Conversation message types (`MessageRole`, `Message`)
//! - `repository`: Repository trait for session persistence

mod message;
mod model;
mod progress;
mod repository;

pub use message::{Message, MessageRole};
pub use model::{Session, SessionContext, SessionStatus, group_by_title};
pub use progress::{ConversationState, Progress};
pub use repository::SessionRepository;
