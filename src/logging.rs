//! Logging setup
//!
//! Diagnostics go to stderr so that stdout stays clean for answers and the
//! interactive transcript. `RUST_LOG` takes precedence over the configured
//! level.

use crate::config::LoggingConfig;
use crate::error::{PdfChatError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter from `RUST_LOG` or the configured directive
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            PdfChatError::Config(format!("Invalid log level '{}': {}", config.level, e)).into()
        })
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails on an unparseable level directive or when a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_filter_from_config() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "pdfchat=debug".to_string(),
            json_format: false,
        };
        let filter = env_filter(&config).unwrap();
        assert_eq!(filter.to_string(), "pdfchat=debug");
    }

    #[test]
    #[serial]
    fn test_rust_log_wins_over_config() {
        std::env::set_var("RUST_LOG", "pdfchat=trace");
        let config = LoggingConfig::default();
        let filter = env_filter(&config).unwrap();
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "pdfchat=trace");
    }
}
