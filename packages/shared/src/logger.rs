//! Logging setup utilities for the Hiroba chat server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the default filter directive used when `RUST_LOG` is not set.
///
/// Every crate in `crate_names` and the binary itself log at `default_log_level`.
/// HTTP request traces from `tower_http` follow the same level.
pub fn default_filter(crate_names: &[&str], binary_name: &str, default_log_level: &str) -> String {
    let mut directives: Vec<String> = crate_names
        .iter()
        .chain(std::iter::once(&binary_name))
        .map(|name| format!("{}={}", name.replace('-', "_"), default_log_level))
        .collect();
    directives.push(format!("tower_http={}", default_log_level));
    directives.dedup();
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `crate_names` - Library crates whose logs should be shown (e.g. `["hiroba-server"]`)
/// * `binary_name` - The name of the binary (e.g. "hiroba-server")
/// * `default_log_level` - The default log level (e.g. "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use hiroba_shared::logger::setup_logger;
///
/// setup_logger(&["hiroba-server"], "hiroba-server", "debug");
/// ```
pub fn setup_logger(crate_names: &[&str], binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_filter(crate_names, binary_name, default_log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
