//! Structured logging setup for stored-keys tools and services
//!
//! The `stored-keys` library only emits `tracing` events; whoever embeds it
//! picks one of these initialisers (or installs its own subscriber).

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize JSON logging (for production)
///
/// This sets up:
/// - JSON formatted logs
/// - `RUST_LOG` filtering, falling back to `default_level`
/// - Service name tagging on the first event
pub fn init_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    tracing::info!(service = service_name, "Logging initialized");
}

/// Initialize human-readable console logging (for operator tools)
pub fn init_console_logging(service_name: &str, default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .init();

    tracing::info!(service = service_name, "Console logging initialized");
}

/// Like [`init_console_logging`] but does not panic when a global subscriber
/// is already installed. Returns `false` in that case.
pub fn try_init_console_logging(default_level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        // Whichever call runs first wins; the other must report failure
        // instead of panicking.
        let _ = try_init_console_logging("debug");
        assert!(!try_init_console_logging("debug"));
    }
}
