//! Tracing subscriber setup for binaries embedding the engine.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{directives}': {message}")]
    Filter { directives: String, message: String },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::Filter {
        directives: directives.to_string(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber. `RUST_LOG` wins over `config.level`.
/// Records from the `log` crate are forwarded to tracing.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| config.level.clone());
    let filter = parse_filter(&directives)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .flatten_event(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %directives, json = config.json, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("scopekeeper=debug,reqwest=warn").is_ok());
        assert!(matches!(
            parse_filter("scopekeeper=loud"),
            Err(LoggingError::Filter { .. })
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }
}
