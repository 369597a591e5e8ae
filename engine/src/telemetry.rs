//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. Logs always go to
//! stderr so `--json` reports on stdout stay machine-readable.
//!
//! Degradation events are emitted at `warn` with a `degradation` field
//! (`planning_degraded`, `connector_failure`, `resolution_miss`,
//! `qualification_failure`, `copy_failure`), which makes them easy to
//! filter in the JSON output of release builds.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for a configured level.
///
/// The HTTP and SQL stacks are held at `warn` unless `RUST_LOG` says otherwise.
pub fn filter_directive(log_level: &str) -> String {
    format!(
        "{lvl},scout_engine={lvl},sqlx=warn,hyper=warn,reqwest=warn",
        lvl = log_level
    )
}

/// Initialize the tracing subscriber with the given log level from config.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info"
///
/// In debug builds: pretty-printed output.
/// In release builds: JSON structured output with spans.
///
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_parses() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("debug,scout_engine=debug"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
