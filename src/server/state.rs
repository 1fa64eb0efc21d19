//! Server shared state
//!
//! Holds configuration and the issuance service shared by all handlers.

use crate::config::Config;
use crate::error::Result;
use crate::issuance::KeyIssuer;
use crate::keygen::KeyEncoder;
use crate::notify::{Notifier, SmtpNotifier};
use crate::qrng::{get_source, RandomBitSource};
use crate::store::{KeyStore, MemoryKeyStore, PostgresKeyStore};
use std::sync::Arc;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration, fixed at startup
    pub config: Config,

    /// Issuance service
    pub issuer: KeyIssuer,

    source: Arc<dyn RandomBitSource>,
}

impl AppState {
    /// Assemble state from explicit collaborators
    pub fn new(
        config: Config,
        store: Arc<dyn KeyStore>,
        notifier: Arc<dyn Notifier>,
        source: Arc<dyn RandomBitSource>,
    ) -> Self {
        let encoder = KeyEncoder::new(source.clone(), config.keys.length);
        let issuer = KeyIssuer::new(store, notifier, encoder, config.keys.max_attempts);
        Self {
            config,
            issuer,
            source,
        }
    }

    /// Build production state: PostgreSQL store, SMTP notifier, configured source
    pub fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(PostgresKeyStore::connect_lazy(&config.database)?);
        Ok(Self::with_store(config, store))
    }

    /// Build state over an in-memory store (keys are lost on exit)
    pub fn in_memory(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryKeyStore::new()))
    }

    fn with_store(config: Config, store: Arc<dyn KeyStore>) -> Self {
        let notifier = Arc::new(SmtpNotifier::new(config.mail.clone()));
        let source = get_source(&config.qrng.source, &config.qrng);
        Self::new(config, store, notifier, source)
    }

    /// The random source keys are generated from
    pub fn source(&self) -> &Arc<dyn RandomBitSource> {
        &self.source
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        self.issuer.store()
    }
}
