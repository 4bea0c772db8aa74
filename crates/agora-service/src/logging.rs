use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the global subscriber.
///
/// `format = "json"` emits one JSON object per event for log shippers; any
/// other value prints human-readable multi-line output. `RUST_LOG`, when set,
/// replaces the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| configured_filter(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

/// Unparseable directives fall back to `info`.
fn configured_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_directives_are_kept() {
        let filter = configured_filter("agora_persist=debug");
        assert_eq!(filter.to_string(), "agora_persist=debug");
    }

    #[test]
    fn test_bad_level_falls_back_to_info() {
        let filter = configured_filter("agora_persist=loud");
        assert_eq!(filter.to_string(), "info");
    }
}
