//! Structured logging configuration.
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.
//! Records from the library's `log` facade are captured as well.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparseable
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

fn filter_from(value: Option<&str>) -> EnvFilter {
    value
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var.
pub fn init() {
    let env_filter = filter_from(std::env::var("RUST_LOG").ok().as_deref());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log how long an engine operation took
///
/// # Arguments
///
/// * `operation` - Command name
/// * `target_id` - Tournament, match or registration the command acted on
/// * `duration_ms` - Duration in milliseconds
pub fn log_operation(operation: &str, target_id: Option<i64>, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            target_id = target_id,
            duration_ms = duration_ms,
            "Slow engine operation"
        );
    } else {
        tracing::info!(
            operation = operation,
            target_id = target_id,
            duration_ms = duration_ms,
            "Engine operation finished"
        );
    }
}
