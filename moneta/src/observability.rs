//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install the global JSON tracing subscriber
///
/// The filter comes from `service.log_level` and accepts full `EnvFilter`
/// directives (`"info,moneta=debug"`). An unparsable directive falls back to
/// `info`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| Error::ImproperlyConfigured(format!("Tracing already initialized: {}", e)))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );
    if config.service.debug {
        tracing::warn!("Debug mode enabled: error responses include raw diagnostics");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = Config::default();
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(Error::ImproperlyConfigured(_))
        ));
    }
}
