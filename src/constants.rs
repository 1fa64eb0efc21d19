//! Centralized constants for the q-keygen crate
//!
//! Values shared by more than one module live here so the HTTP layer,
//! the CLI and the issuance service agree on them.

/// Key shape constants
pub mod keys {
    /// Default API key length in hex characters
    pub const DEFAULT_KEY_LENGTH: usize = 52;

    /// Random bits consumed per hex digit
    pub const BITS_PER_HEX_DIGIT: usize = 4;

    /// Provenance tag used when a request does not name a creator
    pub const DEFAULT_CREATOR: &str = "user_request";

    /// Provenance tag the `api_keys.created_by` column defaults to
    pub const SYSTEM_CREATOR: &str = "system";
}

/// Simulated quantum hardware limits
pub mod circuit {
    /// Largest register measured in a single shot
    pub const MAX_QUBITS_PER_SHOT: usize = 24;
}

/// External API endpoints
pub mod api {
    /// ANU QRNG free tier (has expired SSL cert)
    pub const ANU_FREE_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php";

    /// ANU QRNG paid tier (requires API key)
    pub const ANU_PAID_URL: &str = "https://api.quantumnumbers.anu.edu.au";
}

/// Mail delivery
pub mod mail {
    /// Default SMTP relay (implicit TLS)
    pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

    /// Default SMTPS port
    pub const DEFAULT_SMTP_PORT: u16 = 465;

    /// Subject line of the key delivery message
    pub const KEY_SUBJECT: &str = "Your New Quantum-Powered API Key";
}

/// Environment variables overlaid onto the config at startup
pub mod env {
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
    pub const EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
    pub const FRONTEND_URL: &str = "FRONTEND_URL";
}
