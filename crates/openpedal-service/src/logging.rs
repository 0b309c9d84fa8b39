//! Log subscriber for the daemon.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Level for the workspace crates at `-v` count `verbosity`.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter from `RUST_LOG`, or `pedald=<level>,openpedal=<level>` when unset.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    let level = level_for(verbosity);
    // Directive targets match by prefix, so `openpedal` covers every workspace crate
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("pedald={level},openpedal={level}")))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let installed = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Log subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }
}
