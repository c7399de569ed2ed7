//! Tracing subscriber setup.
//!
//! The storage layer logs through the `log` facade while the orchestrator
//! uses `tracing` spans; the `tracing-log` bridge funnels both into one
//! subscriber. Filtering follows `RUST_LOG` with an `info` default.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber. Call once at process start; a second
/// call returns an error from the underlying registries.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
