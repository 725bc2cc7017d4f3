//! Session domain model.

use super::progress::{ConversationState, Progress};
use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a session. Sessions are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// Mutable per-turn context persisted with the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// At most one in-flight intent per session.
    #[serde(default)]
    pub progress: Option<Progress>,
}

/// A chat session scoped to one workspace and operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub current_intent: Option<Intent>,
    #[serde(default)]
    pub context: SessionContext,
    /// Human-readable title; empty until the first user message.
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl Session {
    /// Maximum title length in characters.
    pub const TITLE_MAX_CHARS: usize = 40;

    pub fn new(workspace_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            status: SessionStatus::Active,
            current_intent: None,
            context: SessionContext::default(),
            title: String::new(),
            created_at: now,
            last_message_at: now,
        }
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.context.progress.as_ref()
    }

    pub fn state(&self) -> ConversationState {
        self.progress()
            .map(Progress::state)
            .unwrap_or(ConversationState::Idle)
    }

    /// Derives the title from the first user message, if not set yet.
    pub fn ensure_title(&mut self, first_message: &str) {
        if !self.title.is_empty() {
            return;
        }
        let trimmed = first_message.trim();
        let mut title: String = trimmed.chars().take(Self::TITLE_MAX_CHARS).collect();
        if trimmed.chars().count() > Self::TITLE_MAX_CHARS {
            title.push('…');
        }
        self.title = title;
    }

    /// Marks activity on the session.
    pub fn touch(&mut self) {
        self.last_message_at = Utc::now();
    }

    /// Ends the session. An intent still in flight is dropped and makes the
    /// session CANCELLED; otherwise it is COMPLETED.
    pub fn close(&mut self) -> SessionStatus {
        self.status = if self.context.progress.take().is_some() {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        self.current_intent = None;
        self.status
    }

    /// A message on a closed session opens it again.
    pub fn reopen(&mut self) {
        self.status = SessionStatus::Active;
    }
}

/// Groups recency-ordered sessions by title, keeping first-seen order.
pub fn group_by_title(sessions: Vec<Session>) -> Vec<(String, Vec<Session>)> {
    let mut groups: Vec<(String, Vec<Session>)> = Vec::new();
    for session in sessions {
        match groups.iter_mut().find(|(title, _)| *title == session.title) {
            Some((_, members)) => members.push(session),
            None => groups.push((session.title.clone(), vec![session])),
        }
    }
    groups
}
