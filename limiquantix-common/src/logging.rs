//! Logging initialization using tracing.

use anyhow::{anyhow, Result};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable, one event per line.
    Pretty,
    /// One JSON object per event, for log aggregation.
    Json,
}

/// Levels accepted by [`init_logging`].
pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check whether `level` is a level name the subscriber understands.
pub fn is_valid_level(level: &str) -> bool {
    VALID_LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

/// Build the env filter; `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
/// * `output` - Pretty or JSON formatting
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
/// ```
/// use limiquantix_common::{init_logging, LogOutput};
///
/// init_logging("info", LogOutput::Pretty).unwrap();
/// ```
pub fn init_logging(level: &str, output: LogOutput) -> Result<()> {
    if !is_valid_level(level) {
        return Err(anyhow!("invalid log level '{}', expected one of {:?}", level, VALID_LEVELS));
    }

    let filter = build_filter(level);

    let result = match output {
        LogOutput::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
            )
            .try_init(),
        LogOutput::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
            )
            .try_init(),
    };

    result.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_validation() {
        assert!(is_valid_level("info"));
        assert!(is_valid_level("DEBUG"));
        assert!(!is_valid_level("verbose"));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        assert!(init_logging("loud", LogOutput::Pretty).is_err());
    }
}
