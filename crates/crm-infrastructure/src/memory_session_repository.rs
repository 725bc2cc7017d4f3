//! In-memory session repository, used by tests and ephemeral runs.

use async_trait::async_trait;
use crm_core::error::Result;
use crm_core::session::{Message, Session, SessionRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full message log of a session, oldest first.
    pub async fn messages(&self, session_id: &str) -> Vec<Message> {
        self.messages
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get_or_create(
        &self,
        session_id: Option<&str>,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = session_id.and_then(|id| sessions.get(id)) {
            if existing.workspace_id == workspace_id && existing.user_id == user_id {
                return Ok(existing.clone());
            }
        }

        let mut session = Session::new(workspace_id, user_id);
        if let Some(id) = session_id.filter(|id| !sessions.contains_key(*id)) {
            session.id = id.to_string();
        }
        tracing::debug!(target: "conversation", session_id = %session.id, "created session");
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<()> {
        self.messages
            .write()
            .await
            .entry(message.session_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let log = messages.get(session_id).map(Vec::as_slice).unwrap_or_default();
        Ok(log[log.len().saturating_sub(limit)..].to_vec())
    }

    async fn list_sessions(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.workspace_id == workspace_id && s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::session::MessageRole;

    #[tokio::test]
    async fn get_or_create_reuses_matching_sessions_only() {
        let repo = InMemorySessionRepository::new();
        let first = repo.get_or_create(None, "ws", "op").await.unwrap();

        let again = repo.get_or_create(Some(&first.id), "ws", "op").await.unwrap();
        assert_eq!(again.id, first.id);

        let foreign = repo.get_or_create(Some(&first.id), "ws", "intruder").await.unwrap();
        assert_ne!(foreign.id, first.id);
    }

    #[tokio::test]
    async fn requested_ids_are_honoured_for_new_sessions() {
        let repo = InMemorySessionRepository::new();
        let session = repo.get_or_create(Some("chat-1"), "ws", "op").await.unwrap();
        assert_eq!(session.id, "chat-1");
    }

    #[tokio::test]
    async fn recent_messages_returns_the_tail_in_order() {
        let repo = InMemorySessionRepository::new();
        for i in 0..5 {
            repo.append_message(&Message::new("s", MessageRole::User, format!("m{i}")))
                .await
                .unwrap();
        }
        let tail: Vec<String> = repo
            .recent_messages("s", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(tail, vec!["m3", "m4"]);
        assert!(repo.recent_messages("other", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_list_most_recent_first() {
        let repo = InMemorySessionRepository::new();
        let older = repo.get_or_create(None, "ws", "op").await.unwrap();
        let mut newer = repo.get_or_create(None, "ws", "op").await.unwrap();
        newer.last_message_at = older.last_message_at + chrono::Duration::seconds(5);
        repo.save(&newer).await.unwrap();

        let listed = repo.list_sessions("ws", "op").await.unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed.len(), 2);
    }
}
