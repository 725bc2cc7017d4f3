//! Slot-filling conversation.
//!
//! # Module Structure
//!
//! - `controller`: The per-session state machine (`ConversationController`)
//! - `confirmation`: Bilingual yes/no token matching
//! - `locks`: Per-session turn serialization (`SessionLocks`)

mod confirmation;
mod controller;
mod locks;

pub use confirmation::ConfirmationReply;
pub use controller::{ConversationController, TurnReply};
pub use locks::SessionLocks;
