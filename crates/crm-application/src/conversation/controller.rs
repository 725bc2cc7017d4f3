use super::confirmation::ConfirmationReply;
use super::locks::SessionLocks;
use crate::executor::ActionExecutor;
use crate::reply::ReplyComposer;
use crate::splitter::MultiIntentSplitter;
use anyhow::{Context, Result};
use crm_core::action::{ActionError, ActionRequest, QuickReply};
use crm_core::auth::AuthContext;
use crm_core::config::ConversationConfig;
use crm_core::intent::Intent;
use crm_core::oracle::{HistoryEntry, IntentOracle, OracleRequest, OracleResponse, ProgressHint};
use crm_core::reply::{GeneratedReply, ReplyGenerator, ReplyRequest};
use crm_core::session::{
    ConversationState, Message, MessageRole, Progress, Session, SessionRepository, SessionStatus,
};
use crm_core::slots::{IntentData, validate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CANCELLED: &str = "Cancelled. Nothing was changed.";

/// Result of one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub session_id: String,
    pub reply: String,
    pub quick_replies: Vec<QuickReply>,
    pub state: ConversationState,
    pub intent: Option<Intent>,
    pub is_error: bool,
    /// Fields still outstanding while collecting.
    pub missing_fields: Vec<String>,
}

/// What a turn decided before the reply text is phrased.
struct Draft {
    body: DraftBody,
    intent: Option<Intent>,
    is_error: bool,
}

enum DraftBody {
    Compose(ReplyRequest),
    Direct(String),
}

impl Draft {
    fn compose(request: ReplyRequest) -> Self {
        let intent = Some(request.intent).filter(|i| *i != Intent::Unknown);
        Self {
            body: DraftBody::Compose(request),
            intent,
            is_error: false,
        }
    }

    fn direct(intent: Option<Intent>, text: impl Into<String>) -> Self {
        Self {
            body: DraftBody::Direct(text.into()),
            intent,
            is_error: false,
        }
    }

    fn failed(mut self) -> Self {
        self.is_error = true;
        self
    }
}

/// The slot-filling state machine.
///
/// Drives each session from IDLE through COLLECTING and CONFIRMING to
/// execution. Turns of one session are serialized; the session context is
/// read and written only while its lock is held.
pub struct ConversationController {
    sessions: Arc<dyn SessionRepository>,
    oracle: Arc<dyn IntentOracle>,
    executor: Arc<ActionExecutor>,
    splitter: MultiIntentSplitter,
    replies: ReplyComposer,
    locks: SessionLocks,
    config: ConversationConfig,
}

impl ConversationController {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        oracle: Arc<dyn IntentOracle>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            sessions,
            oracle,
            replies: ReplyComposer::new(executor.directory().clone()),
            splitter: MultiIntentSplitter::new(executor.clone()),
            executor,
            locks: SessionLocks::new(),
            config: ConversationConfig::default(),
        }
    }

    pub fn with_reply_generator(mut self, generator: Arc<dyn ReplyGenerator>) -> Self {
        self.replies = self.replies.with_generator(generator);
        self
    }

    pub fn with_config(mut self, config: ConversationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    /// Handles one operator message.
    ///
    /// A missing or foreign `session_id` starts a new session. Errors are
    /// persistence failures; they abandon this turn only, and whatever was
    /// stored before the failure stays in place for the next one.
    pub async fn handle_turn(
        &self,
        auth: &AuthContext,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<TurnReply> {
        let session = self
            .sessions
            .get_or_create(session_id, &auth.workspace_id, &auth.user_id)
            .await
            .context("Failed to open session")?;
        let _turn = self.locks.acquire(&session.id).await;

        // Another turn may have finished while this one waited.
        let mut session = self
            .sessions
            .find_by_id(&session.id)
            .await
            .context("Failed to reload session")?
            .unwrap_or(session);
        if session.status != SessionStatus::Active {
            tracing::info!(target: "conversation", session_id = %session.id, status = ?session.status, "reopening session");
            session.reopen();
        }

        let history = self
            .sessions
            .recent_messages(&session.id, self.config.history_window)
            .await
            .context("Failed to read recent messages")?;
        session.ensure_title(text);
        self.sessions
            .append_message(&Message::new(&session.id, MessageRole::User, text))
            .await
            .context("Failed to store user message")?;

        tracing::debug!(target: "conversation", session_id = %session.id, state = ?session.state(), "turn started");
        let draft = self.advance(auth, &mut session, text, &history).await;

        let reply = match draft.body {
            DraftBody::Compose(request) => self.replies.compose(&auth.workspace_id, request).await,
            DraftBody::Direct(text) => GeneratedReply::text(text),
        };

        session.current_intent = session.progress().map(Progress::intent).or(draft.intent);
        session.touch();
        self.sessions
            .save(&session)
            .await
            .context("Failed to save session")?;
        self.sessions
            .append_message(
                &Message::new(&session.id, MessageRole::Assistant, &reply.reply)
                    .with_intent(draft.intent)
                    .with_error(draft.is_error),
            )
            .await
            .context("Failed to store reply")?;

        let state = session.state();
        tracing::info!(
            target: "conversation",
            session_id = %session.id,
            intent = ?draft.intent,
            state = ?state,
            is_error = draft.is_error,
            "turn finished"
        );
        Ok(TurnReply {
            missing_fields: session
                .progress()
                .map(|p| p.missing_fields.clone())
                .unwrap_or_default(),
            session_id: session.id,
            reply: reply.reply,
            quick_replies: reply.quick_replies,
            state,
            intent: draft.intent,
            is_error: draft.is_error,
        })
    }

    /// Ends a session of the caller. Returns `None` when no such session
    /// exists in the caller's scope.
    pub async fn close_session(
        &self,
        auth: &AuthContext,
        session_id: &str,
    ) -> Result<Option<SessionStatus>> {
        let _turn = self.locks.acquire(session_id).await;
        let Some(mut session) = self
            .sessions
            .find_by_id(session_id)
            .await
            .context("Failed to load session")?
            .filter(|s| s.workspace_id == auth.workspace_id && s.user_id == auth.user_id)
        else {
            return Ok(None);
        };
        let status = session.close();
        self.sessions
            .save(&session)
            .await
            .context("Failed to save session")?;
        tracing::info!(target: "conversation", session_id, status = ?status, "session closed");
        Ok(Some(status))
    }

    async fn advance(
        &self,
        auth: &AuthContext,
        session: &mut Session,
        text: &str,
        history: &[Message],
    ) -> Draft {
        if let Some(progress) = session.context.progress.take() {
            let intent = progress.intent();
            match (ConfirmationReply::classify(text), progress.pending_confirmation.is_some()) {
                (ConfirmationReply::Affirmative, true) => {
                    return self.run(auth, session, progress.collected_data, true).await;
                }
                (ConfirmationReply::Negative, _) => {
                    tracing::info!(target: "conversation", %intent, "operator cancelled");
                    return Draft::direct(Some(intent), CANCELLED);
                }
                // Held until the oracle has seen the text: a read or a bundle
                // leaves a pending confirmation standing.
                _ => session.context.progress = Some(progress),
            }
        }

        let response = self.classify(session, text, history).await;

        if response.is_multi_intent() {
            let outcome = self
                .splitter
                .run(auth, &response.multiple_intents, Some(&session.id))
                .await;
            let draft = Draft::direct(None, outcome.reply);
            return if outcome.failed.is_some() { draft.failed() } else { draft };
        }

        let incoming = match IntentData::from_extracted(response.intent, &response.extracted_data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(target: "conversation", error = %e, "discarding unusable extraction");
                IntentData::empty(response.intent)
            }
        };

        let current = session.progress().map(Progress::intent);
        if response.intent.is_read_only()
            && current != Some(response.intent)
            && incoming.missing_fields().is_empty()
        {
            // Reads never disturb an intent that is still being collected.
            return self.run_read(auth, session, incoming).await;
        }

        let data = match session.context.progress.take().map(downgrade_confirmation) {
            Some(progress)
                if response.intent != Intent::Unknown
                    && response.intent != progress.intent()
                    && response.confidence >= self.config.switch_confidence =>
            {
                tracing::info!(
                    target: "conversation",
                    from = %progress.intent(),
                    to = %response.intent,
                    confidence = response.confidence,
                    "switching intent"
                );
                incoming
            }
            Some(progress) => merge_into(progress, incoming, text),
            None if incoming.intent() == Intent::Unknown => {
                return Draft::compose(ReplyRequest::new(Intent::Unknown));
            }
            None => incoming,
        };

        self.run(auth, session, data, false).await
    }

    async fn classify(&self, session: &Session, text: &str, history: &[Message]) -> OracleResponse {
        let progress_hint = session.progress().map(|p| ProgressHint {
            intent: p.intent(),
            collected_data: p.collected_data.fields_json(),
            next_field: p.next_field.clone(),
        });
        let request = OracleRequest {
            utterance: text.to_string(),
            recent_history: history.iter().map(HistoryEntry::from).collect(),
            progress_hint,
        };
        match self.oracle.classify(request).await {
            Ok(response) => {
                tracing::debug!(
                    target: "conversation",
                    intent = %response.intent,
                    confidence = response.confidence,
                    "classified"
                );
                response
            }
            Err(e) => {
                tracing::warn!(target: "oracle", error = %e, "classification failed, treating as unknown");
                OracleResponse::unknown()
            }
        }
    }

    /// Validates `data` and executes it once complete.
    async fn run(
        &self,
        auth: &AuthContext,
        session: &mut Session,
        data: IntentData,
        confirmed: bool,
    ) -> Draft {
        let intent = data.intent();
        let missing = validate(&data, confirmed);
        if !missing.is_empty() {
            session.context.progress = Some(Progress::collecting(data, missing.clone()));
            return Draft::compose(ReplyRequest::new(intent).with_missing(missing));
        }

        let request = ActionRequest {
            data: data.clone(),
            confirmed,
        };
        match self.executor.execute(auth, request, Some(&session.id)).await {
            Ok(outcome) => {
                session.context.progress = None;
                Draft::compose(ReplyRequest::new(intent).with_result(outcome.message))
            }
            Err(ActionError::ConfirmationRequired(pending)) => {
                let description = pending.description.clone();
                session.context.progress = Some(Progress::confirming(data, pending));
                Draft::compose(
                    ReplyRequest::new(intent)
                        .with_result(description)
                        .needing_confirmation(),
                )
            }
            Err(ActionError::NoOp(message)) => {
                session.context.progress = None;
                Draft::compose(ReplyRequest::new(intent).with_result(message))
            }
            Err(ActionError::Validation { field, message }) => {
                let error = ActionError::validation(field.as_str(), message).to_string();
                let mut data = data;
                if data.clear_field(&field) {
                    // The rejected slot is asked for again.
                    let mut missing = data.missing_fields();
                    if !missing.contains(&field) {
                        missing.insert(0, field);
                    }
                    session.context.progress = Some(Progress::collecting(data, missing.clone()));
                    Draft::compose(ReplyRequest::new(intent).with_error(error).with_missing(missing))
                } else {
                    session.context.progress = None;
                    Draft::compose(ReplyRequest::new(intent).with_error(error)).failed()
                }
            }
            Err(err) => {
                session.context.progress = None;
                Draft::compose(ReplyRequest::new(intent).with_error(err.to_string())).failed()
            }
        }
    }

    /// Executes a complete read-only intent without touching the progress.
    async fn run_read(&self, auth: &AuthContext, session: &Session, data: IntentData) -> Draft {
        let intent = data.intent();
        match self
            .executor
            .execute(auth, ActionRequest::new(data), Some(&session.id))
            .await
        {
            Ok(outcome) => Draft::compose(ReplyRequest::new(intent).with_result(outcome.message)),
            Err(err) => {
                Draft::compose(ReplyRequest::new(intent).with_error(err.to_string())).failed()
            }
        }
    }
}

/// Turns a held confirmation back into collection so the text can amend it.
fn downgrade_confirmation(progress: Progress) -> Progress {
    if progress.pending_confirmation.is_none() {
        return progress;
    }
    let missing = progress.collected_data.missing_fields();
    Progress::collecting(progress.collected_data, missing)
}

/// Folds newly extracted data into the collected data of `progress`.
///
/// Only keys the oracle actually returned override collected values. When it
/// returned nothing usable and exactly one field is outstanding, the raw text
/// fills that field.
fn merge_into(progress: Progress, incoming: IntentData, text: &str) -> IntentData {
    let mut data = progress.collected_data;
    let extracted_any = incoming.intent() == data.intent() && !incoming.filled_fields().is_empty();
    if extracted_any {
        data.merge(incoming);
        return data;
    }

    if let ([only], Some(next)) = (progress.missing_fields.as_slice(), &progress.next_field) {
        if only == next {
            if let Err(e) = data.set_field(next, text) {
                tracing::debug!(target: "conversation", field = %next, error = %e, "raw text does not fit the slot");
            }
        }
    }
    data
}
