//! In-memory key store
//!
//! Backs `serve --memory` and the test suite. Both uniqueness checks and the
//! insert happen under one write lock, so concurrent inserts behave like the
//! UNIQUE constraints of the SQL schema.

use crate::error::{Error, Result};
use crate::store::{ApiKeyRecord, KeyStore, NewApiKey};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ApiKeyRecord>,
    next_id: i64,
}

/// Process-local key store
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the store
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored record, in insertion order
    pub async fn records(&self) -> Vec<ApiKeyRecord> {
        self.inner.read().await.records.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::DatabaseUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.check_available()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ApiKeyRecord>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.email == email).cloned())
    }

    async fn key_exists(&self, api_key: &str) -> Result<bool> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner.records.iter().any(|r| r.api_key == api_key))
    }

    async fn insert(&self, new_key: NewApiKey) -> Result<ApiKeyRecord> {
        self.check_available()?;
        let mut inner = self.inner.write().await;

        if inner.records.iter().any(|r| r.email == new_key.email) {
            return Err(Error::DuplicateEmail(new_key.email));
        }
        if inner.records.iter().any(|r| r.api_key == new_key.api_key) {
            return Err(Error::DuplicateKey);
        }

        inner.next_id += 1;
        let record = ApiKeyRecord {
            id: inner.next_id,
            email: new_key.email,
            api_key: new_key.api_key,
            created_by: new_key.created_by,
            created_at: Utc::now(),
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn count(&self) -> Result<u64> {
        self.check_available()?;
        Ok(self.inner.read().await.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_key(email: &str, api_key: &str) -> NewApiKey {
        NewApiKey {
            email: email.to_string(),
            api_key: api_key.to_string(),
            created_by: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryKeyStore::new();
        let a = store.insert(new_key("a@example.com", "aa")).await.unwrap();
        let b = store.insert(new_key("b@example.com", "bb")).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lookup() {
        let store = MemoryKeyStore::new();
        store.insert(new_key("a@example.com", "aa")).await.unwrap();

        let found = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.api_key, "aa");
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
        assert!(store.key_exists("aa").await.unwrap());
        assert!(!store.key_exists("bb").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryKeyStore::new();
        store.insert(new_key("a@example.com", "aa")).await.unwrap();
        let err = store.insert(new_key("a@example.com", "bb")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let store = MemoryKeyStore::new();
        store.insert(new_key("a@example.com", "aa")).await.unwrap();
        let err = store.insert(new_key("b@example.com", "aa")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey));
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryKeyStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_by_email("a@example.com").await,
            Err(Error::DatabaseUnavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.find_by_email("a@example.com").await.is_ok());
    }
}
