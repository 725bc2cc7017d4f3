//! Subscriber setup.
//!
//! Diagnostics go to stderr through an `EnvFilter`-filtered fmt layer
//! (`RUST_LOG`, default `info` without thinking events). Thinking events bypass that filter
//! and are forwarded to a channel the `workflow run` command prints from.

use crm_execution::{ThinkingEvent, ThinkingEventLayer};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub fn init() -> UnboundedReceiver<ThinkingEvent> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,workflow::thinking=off"));
    let (thinking, receiver) = ThinkingEventLayer::channel();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter),
        )
        .with(thinking)
        .init();

    receiver
}
