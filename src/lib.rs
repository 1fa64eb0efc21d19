//! q-keygen: Quantum-Seeded API Key Issuer
//!
//! A library, CLI and HTTP service that issues API keys whose entropy comes
//! from measuring qubits in uniform superposition.
//!
//! ## Features
//!
//! - Multiple random sources (simulated circuit, ANU QRNG, pseudo)
//! - Fixed-length hexadecimal keys assembled from measured bits
//! - One key per email, unique across the store
//! - Delivery by email, with the key returned when delivery fails
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use q_keygen::keygen::encode_key;
//! use q_keygen::qrng::circuit::CircuitSource;
//!
//! let source = CircuitSource::new(24);
//! let key = encode_key(&source, 52).unwrap();
//! assert_eq!(key.len(), 52);
//! println!("Key: {}", key);
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod entropy;
pub mod error;
pub mod issuance;
pub mod keygen;
pub mod notify;
pub mod qrng;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use entropy::EntropyTestResults;
pub use error::{Error, Result};
pub use issuance::{Issuance, KeyIssuer};
pub use keygen::KeyEncoder;
