//! Application layer of the conversational CRM core.
//!
//! Coordinates the domain types with the storage and interaction crates:
//!
//! - [`ActionExecutor`]: runs one resolved `(intent, data)` pair with
//!   identifier resolution, idempotency, confirmation gating and post-write
//!   verification
//! - [`ConversationController`]: the per-session slot-filling state machine
//! - [`MultiIntentSplitter`]: sequential execution of bundled commands
//! - [`ReplyComposer`]: generated replies, filtered against real results

pub mod conversation;
pub mod executor;
pub mod reply;
pub mod splitter;
mod text;

pub use conversation::{ConversationController, SessionLocks, TurnReply};
pub use executor::{ActionExecutor, VerificationPolicy};
pub use reply::ReplyComposer;
pub use splitter::{MultiIntentSplitter, SECTION_DELIMITER, SplitOutcome};
