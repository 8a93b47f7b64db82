//! Thin wrapper around `tracing-subscriber`, in the same spirit as the
//! console logger the orchestrator sets up before doing anything else.

use std::io;

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs a stdout subscriber honoring `RUST_LOG`, defaulting to `info`.
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_stdout_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let collector = tracing_subscriber::registry()
        .with(fmt::Layer::new().with_writer(io::stdout).with_filter(filter));
    let _ = collector.try_init();
}
