//! Directory-backed session repository.
//!
//! Directory structure:
//! ```text
//! sessions/
//! ├── <session-id-1>.json   # session + its message log
//! └── <session-id-2>.json
//! ```

use crate::paths::CrmPaths;
use async_trait::async_trait;
use crm_core::error::{CrmError, Result};
use crm_core::session::{Message, Session, SessionRepository};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    session: Session,
    #[serde(default)]
    messages: Vec<Message>,
}

pub struct DirSessionRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DirSessionRepository {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Repository at `~/.config/crm-agent/sessions`.
    pub async fn default_location() -> Result<Self> {
        let dir = CrmPaths::sessions_dir().map_err(|e| CrmError::config(e.to_string()))?;
        Self::new(dir).await
    }

    fn record_path(&self, session_id: &str) -> Option<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{session_id}.json")))
    }

    async fn read_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let Some(path) = self.record_path(session_id) else {
            return Ok(None);
        };
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &SessionRecord) -> Result<()> {
        let path = self
            .record_path(&record.session.id)
            .ok_or_else(|| CrmError::data_access(format!("invalid session id '{}'", record.session.id)))?;
        let tmp_path = self.dir.join(format!(".{}.json.tmp", record.session.id));
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for DirSessionRepository {
    async fn get_or_create(
        &self,
        session_id: Option<&str>,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Session> {
        let _guard = self.write_lock.lock().await;
        let existing = match session_id {
            Some(id) => self.read_record(id).await?,
            None => None,
        };
        if let Some(record) = &existing {
            if record.session.workspace_id == workspace_id && record.session.user_id == user_id {
                return Ok(record.session.clone());
            }
        }

        let mut session = Session::new(workspace_id, user_id);
        if let Some(id) = session_id.filter(|id| existing.is_none() && self.record_path(id).is_some()) {
            session.id = id.to_string();
        }
        self.write_record(&SessionRecord {
            session: session.clone(),
            messages: Vec::new(),
        })
        .await?;
        tracing::debug!(target: "conversation", session_id = %session.id, "created session file");
        Ok(session)
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.read_record(session_id).await?.map(|r| r.session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let messages = self
            .read_record(&session.id)
            .await?
            .map(|r| r.messages)
            .unwrap_or_default();
        self.write_record(&SessionRecord {
            session: session.clone(),
            messages,
        })
        .await
    }

    async fn append_message(&self, message: &Message) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read_record(&message.session_id)
            .await?
            .ok_or_else(|| CrmError::not_found("session", message.session_id.clone()))?;
        record.messages.push(message.clone());
        self.write_record(&record).await
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>> {
        let messages = self
            .read_record(session_id)
            .await?
            .map(|r| r.messages)
            .unwrap_or_default();
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn list_sessions(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Session>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_record(id).await {
                Ok(Some(record))
                    if record.session.workspace_id == workspace_id
                        && record.session.user_id == user_id =>
                {
                    sessions.push(record.session)
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "conversation", path = %path.display(), error = %e, "skipping unreadable session file");
                }
            }
        }
        sessions.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::intent::Intent;
    use crm_core::session::{MessageRole, Progress};
    use crm_core::slots::IntentData;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sessions_survive_a_new_repository_instance() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
        let mut session = repo.get_or_create(None, "ws", "op").await.unwrap();
        let data = IntentData::empty(Intent::UserCreate);
        let missing = data.missing_fields();
        session.context.progress = Some(Progress::collecting(data, missing));
        session.ensure_title("create user named Ali");
        repo.save(&session).await.unwrap();
        repo.append_message(&Message::new(&session.id, MessageRole::User, "create user named Ali"))
            .await
            .unwrap();

        let reopened = DirSessionRepository::new(temp_dir.path()).await.unwrap();
        let loaded = reopened.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(reopened.recent_messages(&session.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn appending_to_an_unknown_session_fails() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
        let err = repo
            .append_message(&Message::new("missing", MessageRole::User, "hi"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn listing_filters_by_scope() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(temp_dir.path()).await.unwrap();
        repo.get_or_create(None, "ws", "op").await.unwrap();
        repo.get_or_create(None, "ws", "op").await.unwrap();
        repo.get_or_create(None, "ws", "someone-else").await.unwrap();

        assert_eq!(repo.list_sessions("ws", "op").await.unwrap().len(), 2);
    }
}
