//! Key delivery
//!
//! A `Notifier` hands a freshly issued key to its owner. Delivery failures are
//! reported to the caller, which decides whether they matter.

pub mod smtp;

use crate::error::Result;
use async_trait::async_trait;

pub use smtp::SmtpNotifier;

/// Delivers an issued key to a recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Send `key` to `recipient`
    async fn send_key(&self, recipient: &str, key: &str) -> Result<()>;
}

/// Plaintext body of the key delivery message
pub fn key_message_body(key: &str) -> String {
    format!(
        "Welcome!\n\nYour new secure API Key is: {}\n\nPlease store it safely.",
        key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_contains_key() {
        let body = key_message_body("00af");
        assert!(body.starts_with("Welcome!"));
        assert!(body.contains("Your new secure API Key is: 00af"));
    }
}
