//! Wiring of stores, clients and services for one CLI invocation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use crm_application::{ActionExecutor, ConversationController, VerificationPolicy};
use crm_core::config::AppConfig;
use crm_core::oracle::{IntentOracle, OracleError, OracleRequest, OracleResponse};
use crm_core::reply::ReplyGenerator;
use crm_core::session::SessionRepository;
use crm_execution::WorkflowEngine;
use crm_infrastructure::{
    ConfigService, DirSessionRepository, InMemoryActionLog, InMemoryDirectory,
    TomlWorkflowRepository,
};
use crm_interaction::{HttpIntentOracle, HttpReplyGenerator};
use std::path::Path;
use std::sync::Arc;

/// Oracle used when no endpoint is configured.
///
/// Every classification fails, so each turn degrades to the help reply.
struct UnconfiguredOracle(String);

#[async_trait]
impl IntentOracle for UnconfiguredOracle {
    async fn classify(&self, _request: OracleRequest) -> Result<OracleResponse, OracleError> {
        Err(OracleError::NotConfigured(self.0.clone()))
    }
}

pub struct Runtime {
    pub config: AppConfig,
    pub executor: Arc<ActionExecutor>,
    pub sessions: Arc<dyn SessionRepository>,
    pub workflows: TomlWorkflowRepository,
    oracle: Arc<dyn IntentOracle>,
    replies: Option<Arc<dyn ReplyGenerator>>,
}

impl Runtime {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new(),
        };
        let config = service.get_config().context("Failed to load configuration")?;

        // The directory lives for this process only; no persistent store is wired up.
        let directory = Arc::new(InMemoryDirectory::new());
        let audit = Arc::new(InMemoryActionLog::new());
        let executor = Arc::new(
            ActionExecutor::new(directory, audit)
                .with_verification(VerificationPolicy::from_config(&config.verification)),
        );

        let sessions: Arc<dyn SessionRepository> = Arc::new(
            DirSessionRepository::default_location()
                .await
                .context("Failed to open session store")?,
        );

        let workflows = match &config.workflow.directory {
            Some(dir) => TomlWorkflowRepository::new(dir.clone()),
            None => TomlWorkflowRepository::default_location()
                .context("Failed to locate workflow directory")?,
        };

        let oracle: Arc<dyn IntentOracle> = match HttpIntentOracle::from_config(&config.oracle) {
            Ok(oracle) => Arc::new(oracle),
            Err(err) => {
                tracing::warn!("Intent oracle unavailable: {}", err);
                Arc::new(UnconfiguredOracle(err.to_string()))
            }
        };

        let replies: Option<Arc<dyn ReplyGenerator>> = match HttpReplyGenerator::from_config(&config.reply) {
            Ok(Some(generator)) => Some(Arc::new(generator)),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Reply generator unavailable, using templates: {}", err);
                None
            }
        };

        Ok(Self {
            config,
            executor,
            sessions,
            workflows,
            oracle,
            replies,
        })
    }

    /// Whether chat turns can be classified at all.
    pub fn has_oracle(&self) -> bool {
        self.config.oracle.endpoint.is_some()
    }

    pub fn controller(&self) -> ConversationController {
        let controller = ConversationController::new(
            self.sessions.clone(),
            self.oracle.clone(),
            self.executor.clone(),
        )
        .with_config(self.config.conversation.clone());
        match &self.replies {
            Some(generator) => controller.with_reply_generator(generator.clone()),
            None => controller,
        }
    }

    pub fn workflow_engine(&self) -> WorkflowEngine {
        WorkflowEngine::from_config(self.executor.clone(), &self.config.workflow)
    }
}
