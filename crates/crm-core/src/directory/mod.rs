//! Workspace directory: users, labels and groups.
//!
//! # Module Structure
//!
//! - `model`: Entity types (`User`, `Label`, `Group`) and the `DirectoryEntity` trait
//! - `store`: Storage traits (`DirectoryStore`, `DirectoryReader`, `DirectoryTransaction`)

mod model;
mod store;

pub use model::{DirectoryEntity, EntityId, Group, Label, User};
pub use store::{DirectoryReader, DirectoryStore, DirectoryTransaction};
