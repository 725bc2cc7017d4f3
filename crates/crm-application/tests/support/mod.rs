//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use crm_application::{ActionExecutor, ConversationController, VerificationPolicy};
use crm_core::auth::{AuthContext, Role};
use crm_core::directory::{
    DirectoryReader, DirectoryStore, DirectoryTransaction, EntityId, Group, Label, User,
};
use crm_core::error::Result as CrmResult;
use crm_core::oracle::{IntentOracle, OracleError, OracleRequest, OracleResponse};
use crm_infrastructure::{
    DirectorySnapshot, InMemoryActionLog, InMemoryDirectory, InMemorySessionRepository,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Oracle answering from a script; an exhausted script answers UNKNOWN.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<OracleResponse, OracleError>>>,
    pub requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Value>) -> Self {
        let responses = responses
            .into_iter()
            .map(|v| Ok(serde_json::from_value(v).expect("Script entries should be oracle responses")))
            .collect();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_error(&self, error: OracleError) {
        self.responses.lock().await.push_back(Err(error));
    }

    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl IntentOracle for ScriptedOracle {
    async fn classify(&self, request: OracleRequest) -> std::result::Result<OracleResponse, OracleError> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(OracleResponse::unknown()))
    }
}

/// Directory whose committed reads trail behind its writes.
///
/// Every transaction remembers the state before it started; the next
/// `lag` readers opened afterwards still see that stale state.
pub struct LaggingDirectory {
    inner: InMemoryDirectory,
    lag: usize,
    remaining: AtomicUsize,
    stale: Mutex<Option<DirectorySnapshot>>,
}

impl LaggingDirectory {
    pub fn new(lag: usize) -> Self {
        Self {
            inner: InMemoryDirectory::new(),
            lag,
            remaining: AtomicUsize::new(0),
            stale: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &InMemoryDirectory {
        &self.inner
    }
}

#[async_trait]
impl DirectoryStore for LaggingDirectory {
    async fn reader(&self, workspace_id: &str) -> CrmResult<Box<dyn DirectoryReader>> {
        let stale = self.stale.lock().await.clone();
        if let Some(stale) = stale {
            let left = self.remaining.load(Ordering::SeqCst);
            if left > 0 {
                self.remaining.store(left - 1, Ordering::SeqCst);
                return Ok(Box::new(stale));
            }
        }
        self.inner.reader(workspace_id).await
    }

    async fn begin(&self, workspace_id: &str) -> CrmResult<Box<dyn DirectoryTransaction>> {
        *self.stale.lock().await = Some(self.inner.snapshot(workspace_id).await);
        self.remaining.store(self.lag, Ordering::SeqCst);
        self.inner.begin(workspace_id).await
    }
}

/// Directory whose commits report success but publish nothing.
pub struct LostCommitDirectory {
    inner: InMemoryDirectory,
}

impl LostCommitDirectory {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDirectory::new(),
        }
    }

    pub fn inner(&self) -> &InMemoryDirectory {
        &self.inner
    }
}

#[async_trait]
impl DirectoryStore for LostCommitDirectory {
    async fn reader(&self, workspace_id: &str) -> CrmResult<Box<dyn DirectoryReader>> {
        self.inner.reader(workspace_id).await
    }

    async fn begin(&self, workspace_id: &str) -> CrmResult<Box<dyn DirectoryTransaction>> {
        let tx = self.inner.begin(workspace_id).await?;
        Ok(Box::new(LostCommit(tx)))
    }
}

struct LostCommit(Box<dyn DirectoryTransaction>);

#[async_trait]
impl DirectoryReader for LostCommit {
    async fn users(&self) -> CrmResult<Vec<User>> {
        self.0.users().await
    }

    async fn labels(&self) -> CrmResult<Vec<Label>> {
        self.0.labels().await
    }

    async fn groups(&self) -> CrmResult<Vec<Group>> {
        self.0.groups().await
    }
}

#[async_trait]
impl DirectoryTransaction for LostCommit {
    async fn save_user(&mut self, user: User) -> CrmResult<User> {
        self.0.save_user(user).await
    }

    async fn delete_user(&mut self, id: EntityId) -> CrmResult<()> {
        self.0.delete_user(id).await
    }

    async fn save_label(&mut self, label: Label) -> CrmResult<Label> {
        self.0.save_label(label).await
    }

    async fn delete_label(&mut self, id: EntityId) -> CrmResult<()> {
        self.0.delete_label(id).await
    }

    async fn save_group(&mut self, group: Group) -> CrmResult<Group> {
        self.0.save_group(group).await
    }

    async fn delete_group(&mut self, id: EntityId) -> CrmResult<()> {
        self.0.delete_group(id).await
    }

    async fn commit(self: Box<Self>) -> CrmResult<()> {
        // The inner transaction is dropped, which discards its writes.
        Ok(())
    }
}

pub fn admin() -> AuthContext {
    AuthContext::new("ws-1", "operator", Role::Admin)
}

pub fn fast_verification(max_attempts: u32) -> VerificationPolicy {
    VerificationPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        multiplier: 2,
    }
}

pub struct Harness {
    pub directory: Arc<InMemoryDirectory>,
    pub audit: Arc<InMemoryActionLog>,
    pub sessions: Arc<InMemorySessionRepository>,
    pub oracle: Arc<ScriptedOracle>,
    pub controller: ConversationController,
}

impl Harness {
    pub fn new(script: Vec<Value>) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let audit = Arc::new(InMemoryActionLog::new());
        let sessions = Arc::new(InMemorySessionRepository::new());
        let oracle = Arc::new(ScriptedOracle::new(script));
        let executor = Arc::new(
            ActionExecutor::new(directory.clone(), audit.clone())
                .with_verification(fast_verification(3)),
        );
        let controller = ConversationController::new(sessions.clone(), oracle.clone(), executor);
        Self {
            directory,
            audit,
            sessions,
            oracle,
            controller,
        }
    }
}
