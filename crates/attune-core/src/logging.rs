//! Logging initialization for the tracing ecosystem.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber with human-readable output.
///
/// Filter resolution order: `RUST_LOG` from the environment, falling back
/// to `default_filter`. Calling more than once is harmless; the first
/// subscriber wins.
pub fn init(default_filter: &str) {
    let filter = env_filter(default_filter);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
    tracing::debug!("tracing initialized");
}

/// Install the global `tracing` subscriber with JSON output, for log
/// collectors.
pub fn init_json(default_filter: &str) {
    let filter = env_filter(default_filter);
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
    tracing::debug!("tracing initialized");
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        init("info");
        init("debug");
        init_json("warn");
    }
}
