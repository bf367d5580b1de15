//! Application state management

use std::sync::Arc;

use crate::{config::Config, error::ErrorTranslator, store::Store};

/// Application state shared across handlers
///
/// Generic over the store backend so the same routers serve the in-memory
/// store and PostgreSQL.
#[derive(Debug, Clone)]
pub struct AppState<St: Store> {
    config: Arc<Config>,
    store: St,
}

impl<St: Store> AppState<St> {
    /// Create state from configuration and a store
    pub fn new(config: Config, store: St) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the store
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Error translator honouring `service.debug`
    pub fn translator(&self) -> ErrorTranslator {
        ErrorTranslator::new(self.config.service.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_translator_follows_debug_flag() {
        let mut config = Config::default();
        assert!(!AppState::new(config.clone(), MemoryStore::new())
            .translator()
            .is_debug());

        config.service.debug = true;
        let state = AppState::new(config, MemoryStore::new());
        assert!(state.translator().is_debug());
        assert_eq!(state.config().service.name, "moneta");
    }
}
