//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default random source
pub const DEFAULT_SOURCE: &str = "circuit";

/// Default upper bound on uniqueness retries per issuance
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default database URL
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/q_keygen";

/// Default size of the database connection pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a pooled connection, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default allowed CORS origin ("*" allows any)
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "q-keygen";
