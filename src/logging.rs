//! Opt-in tracing setup for embedders.
//!
//! The library itself only emits `tracing` events (match/unmatch lines on
//! `info`, merge demotions on `warn`); hosts that already install a
//! subscriber should skip this module entirely.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a stdout subscriber honoring `RUST_LOG`, defaulting to `info` for
/// this crate. Returns false when a global subscriber is already set.
pub fn init() -> bool {
    init_with_filter("warn,classmatch=info")
}

/// Install a stdout subscriber with the given fallback filter directive.
pub fn init_with_filter(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_reports_failure() {
        // Whichever call wins the race, the second one must return false.
        let first = init();
        let second = init();
        assert!(!(first && second));
    }
}
