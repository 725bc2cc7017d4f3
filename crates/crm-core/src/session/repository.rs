//! Session repository trait.
//!
//! Defines the session persistence boundary: lazily created sessions, an
//! append-only message log and per-turn context updates.

use super::message::Message;
use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for session persistence.
///
/// Implementations are not required to serialize concurrent writers of the
/// same session; callers hold a per-session lock around read-modify-write.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Returns the session with `session_id` when it exists and belongs to the
    /// given workspace and user; otherwise creates a fresh one.
    async fn get_or_create(
        &self,
        session_id: Option<&str>,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Session>;

    /// Finds a session by its ID.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Persists context, `current_intent`, `last_message_at`, title and status.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Appends one message to the session log.
    async fn append_message(&self, message: &Message) -> Result<()>;

    /// Returns the last `limit` messages of a session, oldest first.
    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>>;

    /// Lists sessions of an operator in a workspace, most recent first.
    async fn list_sessions(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Session>>;
}
