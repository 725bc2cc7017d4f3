//! Application configuration.
//!
//! Every section has serde defaults so a partial (or absent) `config.toml`
//! always yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Connection settings of the Intent Oracle service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OracleConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_oracle_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_oracle_backoff_ms(),
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Reply Generator service. Without an endpoint only template replies are used.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ReplyConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ConversationConfig {
    /// Minimum confidence for a different intent to replace in-flight progress.
    #[serde(default = "default_switch_confidence")]
    pub switch_confidence: f64,
    /// Number of recent messages passed to the oracle.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            switch_confidence: default_switch_confidence(),
            history_window: default_history_window(),
        }
    }
}

/// Bounded retry of post-write verification reads.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct VerificationConfig {
    #[serde(default = "default_verify_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_verify_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_verify_multiplier")]
    pub multiplier: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_verify_attempts(),
            initial_backoff_ms: default_verify_backoff_ms(),
            multiplier: default_verify_multiplier(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowConfig {
    /// Directory holding `<id>.toml` definitions.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Upper bound on executed steps per run; unbounded when absent.
    #[serde(default)]
    pub max_steps: Option<usize>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_oracle_backoff_ms() -> u64 {
    500
}

fn default_switch_confidence() -> f64 {
    0.7
}

fn default_history_window() -> usize {
    10
}

fn default_verify_attempts() -> u32 {
    3
}

fn default_verify_backoff_ms() -> u64 {
    50
}

fn default_verify_multiplier() -> u32 {
    2
}
