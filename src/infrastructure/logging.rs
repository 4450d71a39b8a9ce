use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Directives appended to the configured level to quiet chatty dependencies
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn", "redis=warn"];

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        QUIET_DEPENDENCIES
            .iter()
            .filter_map(|directive| directive.parse().ok())
            .fold(EnvFilter::new(level), |filter, directive| {
                filter.add_directive(directive)
            })
    })
}

/// Install the global subscriber.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
/// Calling this twice is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let filter = build_filter(&config.level);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        let config = LoggingConfig::default();

        init_logging(&config);
        init_logging(&config);
    }
}
