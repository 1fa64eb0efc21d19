//! API key persistence
//!
//! One record per email, one email per key. Records are written once and
//! never updated or deleted.

pub mod memory;
pub mod postgres;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryKeyStore;
pub use postgres::PostgresKeyStore;

/// A stored API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Surrogate id assigned by the store
    pub id: i64,
    pub email: String,
    pub api_key: String,
    /// Free-text provenance tag
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Values for a record that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApiKey {
    pub email: String,
    pub api_key: String,
    pub created_by: String,
}

/// Storage for issued keys
///
/// `insert` must enforce both uniqueness invariants itself, reporting
/// `Error::DuplicateEmail` or `Error::DuplicateKey`, and must leave no partial
/// record behind when it fails. Failure to reach the store is
/// `Error::DatabaseUnavailable`.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Short name for logs and status output
    fn name(&self) -> &'static str;

    /// Create the backing table if it does not exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Look up the record issued to `email`
    async fn find_by_email(&self, email: &str) -> Result<Option<ApiKeyRecord>>;

    /// Whether any record already holds `api_key`
    async fn key_exists(&self, api_key: &str) -> Result<bool>;

    /// Store a new record atomically
    async fn insert(&self, new_key: NewApiKey) -> Result<ApiKeyRecord>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;
}
