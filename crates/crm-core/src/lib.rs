//! Domain layer of the conversational CRM core.
//!
//! Holds the entity and session models, the typed slot data, the action
//! error taxonomy and the capability traits (oracle, reply generator,
//! repositories) that the outer crates implement. Nothing here performs I/O.

pub mod action;
pub mod audit;
pub mod auth;
pub mod color;
pub mod config;
pub mod directory;
pub mod error;
pub mod intent;
pub mod oracle;
pub mod reply;
pub mod session;
pub mod slots;
pub mod workflow;

pub use error::{CrmError, Result};
pub use intent::Intent;
pub use slots::IntentData;
