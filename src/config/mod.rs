//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths, then overlays the
//! process environment (DATABASE_URL, EMAIL_ADDRESS, EMAIL_PASSWORD,
//! FRONTEND_URL). The resulting `Config` is built once at startup and passed
//! down explicitly.
//!
//! Config location: ~/.config/q-keygen/config.toml

pub mod defaults;

use crate::constants::{env, keys, mail, circuit};
use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Outgoing mail
    #[serde(default)]
    pub mail: MailConfig,

    /// Cross-origin settings
    #[serde(default)]
    pub cors: CorsConfig,

    /// Key shape and issuance
    #[serde(default)]
    pub keys: KeysConfig,

    /// Random source settings
    #[serde(default)]
    pub qrng: QrngConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a connection before the store counts as unreachable
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address, also the SMTP login
    #[serde(default)]
    pub sender: String,

    /// SMTP password (app password)
    #[serde(default)]
    pub password: String,

    /// SMTP relay host
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port (implicit TLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed frontend origin, "*" for any
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

/// Key settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Key length in hex characters
    #[serde(default = "default_key_length")]
    pub length: usize,

    /// Candidate keys tried before giving up on a unique one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Creator tag used when a request omits one
    #[serde(default = "default_creator")]
    pub default_creator: String,
}

/// Random source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrngConfig {
    /// Source name (circuit, pseudo, anu)
    #[serde(default = "default_source")]
    pub source: String,

    /// Largest simulated register per measurement shot
    #[serde(default = "default_max_qubits")]
    pub max_qubits_per_shot: usize,

    /// ANU QRNG API key (paid tier)
    #[serde(default)]
    pub anu_api_key: String,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
fn default_smtp_host() -> String {
    mail::DEFAULT_SMTP_HOST.to_string()
}
fn default_smtp_port() -> u16 {
    mail::DEFAULT_SMTP_PORT
}
fn default_allowed_origin() -> String {
    DEFAULT_ALLOWED_ORIGIN.to_string()
}
fn default_key_length() -> usize {
    keys::DEFAULT_KEY_LENGTH
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_creator() -> String {
    keys::DEFAULT_CREATOR.to_string()
}
fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}
fn default_max_qubits() -> usize {
    circuit::MAX_QUBITS_PER_SHOT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            password: String::new(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

impl MailConfig {
    /// Whether both sender address and password are present
    pub fn has_credentials(&self) -> bool {
        !self.sender.trim().is_empty() && !self.password.is_empty()
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl CorsConfig {
    /// Whether any origin is allowed
    pub fn allows_any(&self) -> bool {
        let origin = self.allowed_origin.trim();
        origin.is_empty() || origin == "*"
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            length: default_key_length(),
            max_attempts: default_max_attempts(),
            default_creator: default_creator(),
        }
    }
}

impl Default for QrngConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            max_qubits_per_shot: default_max_qubits(),
            anu_api_key: String::new(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config file: {}", e))
            })?;

            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file: {}", e))
            })
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load the config file, overlay the process environment and validate
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from environment-style lookups
    ///
    /// Unset or empty variables leave the current value alone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(url) = get(env::DATABASE_URL) {
            self.database.url = url;
        }
        if let Some(sender) = get(env::EMAIL_ADDRESS) {
            self.mail.sender = sender;
        }
        if let Some(password) = get(env::EMAIL_PASSWORD) {
            self.mail.password = password;
        }
        if let Some(origin) = get(env::FRONTEND_URL) {
            self.cors.allowed_origin = origin;
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.keys.length == 0 {
            return Err(Error::Config("keys.length must be positive".to_string()));
        }
        if self.keys.max_attempts == 0 {
            return Err(Error::Config(
                "keys.max_attempts must be positive".to_string(),
            ));
        }
        if self.qrng.max_qubits_per_shot == 0
            || self.qrng.max_qubits_per_shot > circuit::MAX_QUBITS_PER_SHOT
        {
            return Err(Error::Config(format!(
                "qrng.max_qubits_per_shot must be between 1 and {}",
                circuit::MAX_QUBITS_PER_SHOT
            )));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["database", "url"] => Some(self.database.url.clone()),
            ["database", "max_connections"] => Some(self.database.max_connections.to_string()),
            ["database", "connect_timeout_secs"] => {
                Some(self.database.connect_timeout_secs.to_string())
            }

            ["mail", "sender"] => Some(self.mail.sender.clone()),
            ["mail", "password"] => Some(self.mail.password.clone()),
            ["mail", "smtp_host"] => Some(self.mail.smtp_host.clone()),
            ["mail", "smtp_port"] => Some(self.mail.smtp_port.to_string()),

            ["cors", "allowed_origin"] => Some(self.cors.allowed_origin.clone()),

            ["keys", "length"] => Some(self.keys.length.to_string()),
            ["keys", "max_attempts"] => Some(self.keys.max_attempts.to_string()),
            ["keys", "default_creator"] => Some(self.keys.default_creator.clone()),

            ["qrng", "source"] => Some(self.qrng.source.clone()),
            ["qrng", "max_qubits_per_shot"] => Some(self.qrng.max_qubits_per_shot.to_string()),
            ["qrng", "anu_api_key"] => Some(self.qrng.anu_api_key.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(key, value)?,

            ["database", "url"] => self.database.url = value.to_string(),
            ["database", "max_connections"] => {
                self.database.max_connections = parse_value(key, value)?
            }
            ["database", "connect_timeout_secs"] => {
                self.database.connect_timeout_secs = parse_value(key, value)?
            }

            ["mail", "sender"] => self.mail.sender = value.to_string(),
            ["mail", "password"] => self.mail.password = value.to_string(),
            ["mail", "smtp_host"] => self.mail.smtp_host = value.to_string(),
            ["mail", "smtp_port"] => self.mail.smtp_port = parse_value(key, value)?,

            ["cors", "allowed_origin"] => self.cors.allowed_origin = value.to_string(),

            ["keys", "length"] => self.keys.length = parse_value(key, value)?,
            ["keys", "max_attempts"] => self.keys.max_attempts = parse_value(key, value)?,
            ["keys", "default_creator"] => self.keys.default_creator = value.to_string(),

            ["qrng", "source"] => self.qrng.source = value.to_string(),
            ["qrng", "max_qubits_per_shot"] => {
                self.qrng.max_qubits_per_shot = parse_value(key, value)?
            }
            ["qrng", "anu_api_key"] => self.qrng.anu_api_key = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "database.url",
            "database.max_connections",
            "database.connect_timeout_secs",
            "mail.sender",
            "mail.password",
            "mail.smtp_host",
            "mail.smtp_port",
            "cors.allowed_origin",
            "keys.length",
            "keys.max_attempts",
            "keys.default_creator",
            "qrng.source",
            "qrng.max_qubits_per_shot",
            "qrng.anu_api_key",
        ]
    }

    /// Keys whose values are never printed
    pub fn is_secret(key: &str) -> bool {
        matches!(key, "mail.password" | "qrng.anu_api_key")
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env as std_env;
    use tempfile::TempDir;

    fn with_temp_config<F: FnOnce()>(f: F) {
        let temp_dir = TempDir::new().unwrap();
        std_env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        f();
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.keys.length, 52);
        assert_eq!(config.keys.default_creator, "user_request");
        assert_eq!(config.qrng.source, "circuit");
        assert_eq!(config.qrng.max_qubits_per_shot, 24);
        assert_eq!(config.mail.smtp_port, 465);
        assert!(config.cors.allows_any());
        assert!(!config.mail.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        assert_eq!(config.get("qrng.source"), Some("circuit".to_string()));

        config.set("qrng.source", "pseudo").unwrap();
        assert_eq!(config.get("qrng.source"), Some("pseudo".to_string()));

        config.set("keys.length", "64").unwrap();
        assert_eq!(config.keys.length, 64);
    }

    #[test]
    fn test_every_available_key_is_gettable() {
        let config = Config::default();
        for key in Config::available_keys() {
            assert!(config.get(key).is_some(), "missing getter for {}", key);
        }
    }

    #[test]
    fn test_set_invalid_key() {
        let mut config = Config::default();
        assert!(config.set("invalid.key", "value").is_err());
    }

    #[test]
    fn test_set_invalid_value() {
        let mut config = Config::default();
        assert!(config.set("server.port", "not_a_port").is_err());
    }

    #[test]
    fn test_apply_env_overlays_values() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://db/keys"),
            ("EMAIL_ADDRESS", "keys@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("FRONTEND_URL", "https://app.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.database.url, "postgres://db/keys");
        assert_eq!(config.mail.sender, "keys@example.com");
        assert!(config.mail.has_credentials());
        assert_eq!(config.cors.allowed_origin, "https://app.example.com");
        assert!(!config.cors.allows_any());
    }

    #[test]
    fn test_apply_env_ignores_empty_values() {
        let mut config = Config::default();
        config.apply_env(|name| (name == "DATABASE_URL").then(String::new));
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.keys.length = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.keys.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.qrng.max_qubits_per_shot = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        with_temp_config(|| {
            let mut config = Config::default();
            config.qrng.source = "pseudo".to_string();
            config.keys.length = 40;
            config.save().unwrap();

            let loaded = Config::load().unwrap();
            assert_eq!(loaded.qrng.source, "pseudo");
            assert_eq!(loaded.keys.length, 40);
        });
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded: Config = toml::from_str("[keys]\nlength = 32\n").unwrap();
        assert_eq!(loaded.keys.length, 32);
        assert_eq!(loaded.keys.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(loaded.server.port, DEFAULT_PORT);
    }

    #[test]
    fn test_serialization_format() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();

        assert!(toml.contains("[server]"));
        assert!(toml.contains("[database]"));
        assert!(toml.contains("[mail]"));
        assert!(toml.contains("[keys]"));
        assert!(toml.contains("[qrng]"));
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(Config::default().server_addr(), "127.0.0.1:5000");
    }
}
