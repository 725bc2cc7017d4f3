//! Tracing layer streaming workflow thinking events.
//!
//! The engine reports every phase of a run as a `tracing` event on the
//! [`THINKING_TARGET`] target. This layer picks exactly those events up and
//! forwards them over a tokio channel, e.g. to a CLI printing live progress.

use crate::engine::THINKING_TARGET;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One phase of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingEvent {
    pub run_id: String,
    pub workflow_id: String,
    /// `start`, `step_start`, `condition_check`, `step_execute`,
    /// `step_complete`, `delay`, `report`, `error`, `complete` or `failed`.
    pub phase: String,
    pub step_id: Option<String>,
    pub message: String,
    /// Any further structured fields of the event.
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

pub struct ThinkingEventLayer {
    sender: mpsc::UnboundedSender<ThinkingEvent>,
}

impl ThinkingEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<ThinkingEvent>) -> Self {
        Self { sender }
    }

    /// Creates a layer together with the receiving end of its stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ThinkingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for ThinkingEventLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != THINKING_TARGET {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut take = |name: &str| match fields.remove(name) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let run_id = take("run_id");
        let workflow_id = take("workflow_id");
        let phase = take("phase");
        let message = take("message");
        let step_id = Some(take("step_id")).filter(|s| !s.is_empty());

        let thinking = ThinkingEvent {
            run_id,
            workflow_id,
            phase,
            step_id,
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Nobody listening is fine; the run does not depend on the stream.
        let _ = self.sender.send(thinking);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // Display-formatted fields (`%x`) and the message arrive here too.
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn only_thinking_events_are_forwarded() {
        let (layer, mut rx) = ThinkingEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "workflow", "not a thinking event");
            tracing::info!(
                target: THINKING_TARGET,
                run_id = %"run-1",
                workflow_id = %"onboarding",
                phase = "step_start",
                step_id = "A",
                attempt = 2u64,
                "step {} ({})",
                "A",
                "GROUP_CREATE"
            );
        });

        let event = rx.try_recv().expect("Thinking event should be forwarded");
        assert_eq!(event.run_id, "run-1");
        assert_eq!(event.workflow_id, "onboarding");
        assert_eq!(event.phase, "step_start");
        assert_eq!(event.step_id.as_deref(), Some("A"));
        assert_eq!(event.message, "step A (GROUP_CREATE)");
        assert_eq!(event.fields.get("attempt"), Some(&serde_json::json!(2)));
        assert!(rx.try_recv().is_err(), "Other targets should be ignored");
    }
}
