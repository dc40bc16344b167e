//! Log setup for the `workbench` binary and embedding front ends.
//!
//! The CLI streams command output (session lists, tree rows, shell replies)
//! on stdout, so every log line goes to stderr. `--log-json` /
//! `WORKBENCH_LOG_JSON` switch the format to one JSON object per line.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for a configured `log_level` (`WORKBENCH_LOG_LEVEL` or
/// the settings file). The `workbench` prefix matches both the
/// `workbench_core` and `workbench_cli` targets.
pub fn default_filter(log_level: &str) -> String {
    format!("workbench={log_level}")
}

/// Install the global subscriber.
///
/// `filter` applies when `RUST_LOG` is unset.
pub fn init_tracing(filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
