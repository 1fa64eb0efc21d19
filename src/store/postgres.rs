//! PostgreSQL key store

use crate::config::DatabaseConfig;
use crate::constants::keys::SYSTEM_CREATOR;
use crate::error::{Error, Result};
use crate::store::{ApiKeyRecord, KeyStore, NewApiKey};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use std::time::Duration;
use tracing::info;

fn create_table_sql() -> String {
    format!(
        r#"
    CREATE TABLE IF NOT EXISTS api_keys (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        api_key TEXT NOT NULL UNIQUE,
        created_by TEXT NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#,
        SYSTEM_CREATOR
    )
}

/// Key store backed by the `api_keys` table
#[derive(Debug, Clone)]
pub struct PostgresKeyStore {
    pool: PgPool,
}

impl PostgresKeyStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily connecting pool
    ///
    /// No connection is opened here, so the server can start while the
    /// database is down; each request reports connectivity on its own.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)
            .map_err(|e| Error::Config(format!("Invalid database URL: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Check out a connection
    ///
    /// Every failure here (refused, timed out, rejected credentials, missing
    /// database) means the store is unreachable.
    async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(connect_error)
    }
}

fn connect_error(err: sqlx::Error) -> Error {
    Error::DatabaseUnavailable(format!("Could not connect to database: {}", err))
}

/// Map a driver error, separating "cannot reach the database" from the rest
fn storage_error(context: &str, err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => {
            Error::DatabaseUnavailable(format!("{}: {}", context, err))
        }
        _ => Error::Database(format!("{}: {}", context, err)),
    }
}

/// Map an insert failure
///
/// Email conflicts never reach here (`ON CONFLICT (email) DO NOTHING`), so a
/// unique violation is a key collision whatever the constraint is called.
fn insert_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::DuplicateKey;
        }
    }
    storage_error("Failed to insert API key", err)
}

fn row_to_record(row: &PgRow) -> Result<ApiKeyRecord> {
    let get_err = |e: sqlx::Error| Error::Database(format!("Malformed api_keys row: {}", e));

    Ok(ApiKeyRecord {
        id: row.try_get("id").map_err(get_err)?,
        email: row.try_get("email").map_err(get_err)?,
        api_key: row.try_get("api_key").map_err(get_err)?,
        created_by: row.try_get("created_by").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
    })
}

#[async_trait]
impl KeyStore for PostgresKeyStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.acquire().await?;
        sqlx::query(&create_table_sql())
            .execute(&mut *conn)
            .await
            .map_err(|e| storage_error("Failed to create api_keys table", e))?;

        info!("api_keys table ready");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ApiKeyRecord>> {
        let mut conn = self.acquire().await?;
        let row = sqlx::query(
            r#"
            SELECT id::BIGINT AS id, email, api_key, created_by, created_at
            FROM api_keys
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| storage_error("Failed to look up email", e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn key_exists(&self, api_key: &str) -> Result<bool> {
        let mut conn = self.acquire().await?;
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM api_keys WHERE api_key = $1)")
            .bind(api_key)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| storage_error("Failed to check API key", e))
    }

    async fn insert(&self, new_key: NewApiKey) -> Result<ApiKeyRecord> {
        let mut tx = self.pool.begin().await.map_err(connect_error)?;

        // Dropping `tx` on any early return rolls the insert back.
        let row = sqlx::query(
            r#"
            INSERT INTO api_keys (email, api_key, created_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id::BIGINT AS id, email, api_key, created_by, created_at
            "#,
        )
        .bind(&new_key.email)
        .bind(&new_key.api_key)
        .bind(&new_key.created_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(insert_error)?;

        let Some(row) = row else {
            return Err(Error::DuplicateEmail(new_key.email));
        };
        let record = row_to_record(&row)?;

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit API key", e))?;

        Ok(record)
    }

    async fn count(&self) -> Result<u64> {
        let mut conn = self.acquire().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| storage_error("Failed to count API keys", e))?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgConnectOptions;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_connect_lazy_does_not_touch_network() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            ..Default::default()
        };
        let store = PostgresKeyStore::connect_lazy(&config).unwrap();
        assert_eq!(store.name(), "postgres");
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PostgresKeyStore::connect_lazy(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = storage_error("lookup", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, Error::DatabaseUnavailable(_)));
    }

    #[test]
    fn test_protocol_and_configuration_errors_are_unavailable() {
        let err = storage_error("lookup", sqlx::Error::Protocol("unexpected message".to_string()));
        assert!(matches!(err, Error::DatabaseUnavailable(_)));

        let err = storage_error("lookup", sqlx::Error::Configuration("bad sslmode".into()));
        assert!(matches!(err, Error::DatabaseUnavailable(_)));
    }

    #[test]
    fn test_connect_failure_is_always_unavailable() {
        assert!(matches!(
            connect_error(sqlx::Error::RowNotFound),
            Error::DatabaseUnavailable(_)
        ));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = storage_error("lookup", sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_schema_default_creator() {
        assert!(create_table_sql().contains("DEFAULT 'system'"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_unavailable() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            connect_timeout_secs: 1,
            ..Default::default()
        };
        let store = PostgresKeyStore::connect_lazy(&config).unwrap();
        let err = store.find_by_email("a@example.com").await.unwrap_err();
        assert!(matches!(err, Error::DatabaseUnavailable(_)), "{:?}", err);
    }

    /// Store confined to a throwaway schema of the database at DATABASE_URL
    struct Scratch {
        store: PostgresKeyStore,
        admin: PgPool,
        schema: String,
    }

    impl Scratch {
        async fn new() -> Self {
            let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
            let admin = PgPoolOptions::new()
                .max_connections(1)
                .connect(&url)
                .await
                .unwrap();

            let schema = format!("q_keygen_test_{}", rand::random::<u32>());
            sqlx::query(&format!("CREATE SCHEMA {}", schema))
                .execute(&admin)
                .await
                .unwrap();

            let options = PgConnectOptions::from_str(&url)
                .unwrap()
                .options([("search_path", schema.as_str())]);
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect_lazy_with(options);

            Self {
                store: PostgresKeyStore::new(pool),
                admin,
                schema,
            }
        }

        async fn cleanup(self) {
            sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
                .execute(&self.admin)
                .await
                .unwrap();
        }
    }

    fn new_key(email: &str, api_key: &str) -> NewApiKey {
        NewApiKey {
            email: email.to_string(),
            api_key: api_key.to_string(),
            created_by: "test".to_string(),
        }
    }

    async fn assert_conflicts_are_classified(store: &PostgresKeyStore) {
        store.insert(new_key("a@example.com", "k1")).await.unwrap();

        let err = store.insert(new_key("a@example.com", "k2")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(ref e) if e == "a@example.com"), "{:?}", err);

        let err = store.insert(new_key("b@example.com", "k1")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey), "{:?}", err);

        // Neither failed insert left a row behind
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
        assert!(!store.key_exists("k2").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database at DATABASE_URL"]
    async fn test_insert_conflicts_on_bootstrapped_table() {
        let scratch = Scratch::new().await;
        scratch.store.ensure_schema().await.unwrap();

        assert_conflicts_are_classified(&scratch.store).await;

        scratch.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database at DATABASE_URL"]
    async fn test_insert_conflicts_on_table_with_custom_constraint_names() {
        let scratch = Scratch::new().await;
        sqlx::query(
            r#"
            CREATE TABLE api_keys (
                id SERIAL PRIMARY KEY,
                email TEXT NOT NULL,
                api_key TEXT NOT NULL,
                created_by TEXT NOT NULL DEFAULT 'system',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_owner UNIQUE (email),
                CONSTRAINT uq_token UNIQUE (api_key)
            )
            "#,
        )
        .execute(&scratch.store.pool)
        .await
        .unwrap();

        // Bootstrapping leaves an existing table alone
        scratch.store.ensure_schema().await.unwrap();
        assert_conflicts_are_classified(&scratch.store).await;

        scratch.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database at DATABASE_URL"]
    async fn test_schema_defaults_creator_to_system() {
        let scratch = Scratch::new().await;
        scratch.store.ensure_schema().await.unwrap();

        sqlx::query("INSERT INTO api_keys (email, api_key) VALUES ('s@example.com', 'k9')")
            .execute(&scratch.store.pool)
            .await
            .unwrap();

        let record = scratch
            .store
            .find_by_email("s@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.created_by, SYSTEM_CREATOR);

        scratch.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL server at DATABASE_URL"]
    async fn test_missing_database_is_unavailable() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let options = PgConnectOptions::from_str(&url)
            .unwrap()
            .database(&format!("q_keygen_missing_{}", rand::random::<u32>()));
        let store = PostgresKeyStore::new(
            PgPoolOptions::new()
                .acquire_timeout(Duration::from_secs(2))
                .connect_lazy_with(options),
        );

        let err = store.find_by_email("a@example.com").await.unwrap_err();
        assert!(matches!(err, Error::DatabaseUnavailable(_)), "{:?}", err);

        let err = store.insert(new_key("a@example.com", "k1")).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseUnavailable(_)), "{:?}", err);
    }
}
