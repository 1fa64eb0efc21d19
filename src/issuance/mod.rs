//! Key issuance
//!
//! Issues at most one key per email: look the email up, generate candidate
//! keys until one is not in the store, insert it, then try to deliver it.
//! Delivery is the only step allowed to fail without failing the issuance.

use crate::error::{Error, Result};
use crate::keygen::KeyEncoder;
use crate::notify::Notifier;
use crate::store::{KeyStore, NewApiKey};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of an issuance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuance {
    /// The email already holds a key; nothing was generated
    Existing,
    /// A key was stored and delivered
    Issued { api_key: String },
    /// A key was stored but could not be delivered
    IssuedWithoutNotification { api_key: String },
}

/// Orchestrates generation, persistence and delivery of keys
#[derive(Clone)]
pub struct KeyIssuer {
    store: Arc<dyn KeyStore>,
    notifier: Arc<dyn Notifier>,
    encoder: KeyEncoder,
    max_attempts: u32,
}

impl KeyIssuer {
    pub fn new(
        store: Arc<dyn KeyStore>,
        notifier: Arc<dyn Notifier>,
        encoder: KeyEncoder,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            encoder,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    pub fn encoder(&self) -> &KeyEncoder {
        &self.encoder
    }

    /// Issue a key to `email` unless it already has one
    pub async fn issue_key(&self, email: &str, created_by: &str) -> Result<Issuance> {
        if self.store.find_by_email(email).await?.is_some() {
            info!(email, "API key already exists");
            return Ok(Issuance::Existing);
        }

        let api_key = match self.store_new_key(email, created_by).await? {
            Some(key) => key,
            None => return Ok(Issuance::Existing),
        };

        match self.notifier.send_key(email, &api_key).await {
            Ok(()) => {
                info!(email, "API key issued and delivered");
                Ok(Issuance::Issued { api_key })
            }
            Err(e) => {
                error!(email, notifier = self.notifier.name(), "Failed to send API key email: {}", e);
                Ok(Issuance::IssuedWithoutNotification { api_key })
            }
        }
    }

    /// Generate and insert a unique key
    ///
    /// Returns `None` when a concurrent request stored a key for the same
    /// email first.
    async fn store_new_key(&self, email: &str, created_by: &str) -> Result<Option<String>> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generate_candidate().await?;

            if self.store.key_exists(&candidate).await? {
                warn!(attempt, "Generated API key already in use, retrying");
                continue;
            }

            let new_key = NewApiKey {
                email: email.to_string(),
                api_key: candidate,
                created_by: created_by.to_string(),
            };

            match self.store.insert(new_key).await {
                Ok(record) => return Ok(Some(record.api_key)),
                Err(Error::DuplicateEmail(_)) => {
                    info!(email, "API key stored concurrently for this email");
                    return Ok(None);
                }
                Err(Error::DuplicateKey) => {
                    warn!(attempt, "API key taken between check and insert, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        error!(email, attempts = self.max_attempts, "Could not allocate a unique API key");
        Err(Error::KeyExhausted(self.max_attempts))
    }

    /// Run the synchronous encoder on the blocking pool
    async fn generate_candidate(&self) -> Result<String> {
        let encoder = self.encoder.clone();
        tokio::task::spawn_blocking(move || encoder.encode())
            .await
            .map_err(|e| Error::Internal(format!("Key generation task failed: {}", e)))?
    }
}

impl std::fmt::Debug for KeyIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyIssuer")
            .field("store", &self.store.name())
            .field("notifier", &self.notifier.name())
            .field("encoder", &self.encoder)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
