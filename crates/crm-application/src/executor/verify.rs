//! Post-write verification.
//!
//! After a mutation the affected row is read back and compared with the
//! intended state. Mismatches are retried with increasing backoff; only an
//! exhausted budget is reported as a consistency failure.

use crm_core::action::ActionError;
use crm_core::config::VerificationConfig;
use crm_core::directory::{DirectoryReader, DirectoryStore, EntityId, Group, Label, User};
use std::time::Duration;

/// Bounded retry of verification reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl VerificationPolicy {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.multiplier.max(1),
        }
    }

    /// Delay after failed read number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(self.multiplier.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default())
    }
}

/// Intended state of the row touched by a mutation.
///
/// Entities compare field by field; label and member id sets are `BTreeSet`s,
/// so their comparison ignores order.
#[derive(Debug, Clone)]
pub(crate) enum Expected {
    User(User),
    Label(Label),
    Group(Group),
    UserGone(EntityId),
    LabelGone(EntityId),
    GroupGone(EntityId),
}

impl Expected {
    pub(crate) async fn holds<R>(&self, reader: &R) -> Result<bool, ActionError>
    where
        R: DirectoryReader + ?Sized,
    {
        Ok(match self {
            Expected::User(want) => reader.user(want.id).await?.as_ref() == Some(want),
            Expected::Label(want) => reader.label(want.id).await?.as_ref() == Some(want),
            Expected::Group(want) => reader.group(want.id).await?.as_ref() == Some(want),
            Expected::UserGone(id) => reader.user(*id).await?.is_none(),
            Expected::LabelGone(id) => reader.label(*id).await?.is_none(),
            Expected::GroupGone(id) => reader.group(*id).await?.is_none(),
        })
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Expected::User(u) => format!("user \"{}\"", u.name),
            Expected::Label(l) => format!("label \"{}\"", l.name),
            Expected::Group(g) => format!("group \"{}\"", g.name),
            Expected::UserGone(id) => format!("removal of user #{id}"),
            Expected::LabelGone(id) => format!("removal of label #{id}"),
            Expected::GroupGone(id) => format!("removal of group #{id}"),
        }
    }
}

/// Reads committed state until `expected` holds, returning the number of
/// reads it took.
pub(crate) async fn verify_committed(
    store: &dyn DirectoryStore,
    workspace_id: &str,
    expected: &Expected,
    policy: &VerificationPolicy,
) -> Result<u32, ActionError> {
    for attempt in 1..=policy.max_attempts {
        let reader = store.reader(workspace_id).await?;
        if expected.holds(reader.as_ref()).await? {
            if attempt > 1 {
                tracing::info!(target: "verification", attempt, "write observed after retry");
            }
            return Ok(attempt);
        }
        if attempt < policy.max_attempts {
            let delay = policy.backoff(attempt);
            tracing::warn!(
                target: "verification",
                attempt,
                delay_ms = delay.as_millis() as u64,
                "read does not reflect the write yet"
            );
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!(target: "verification", attempts = policy.max_attempts, "verification budget exhausted");
    Err(ActionError::Consistency(format!(
        "{} could not be confirmed after {} reads",
        expected.describe(),
        policy.max_attempts
    )))
}
