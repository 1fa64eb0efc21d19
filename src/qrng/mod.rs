//! Random bit sources
//!
//! This module defines the `RandomBitSource` trait and implementations for the
//! random sources a key can be seeded from. Each source is a single file
//! implementing the trait.
//!
//! ## Flex Point
//! Adding a new source requires:
//! 1. Create `src/qrng/{source_name}.rs` implementing `RandomBitSource`
//! 2. Add `pub mod {source_name};` below
//! 3. Register it in `get_source` and `available_sources`

pub mod anu;
pub mod bits;
pub mod circuit;
pub mod pseudo;

pub use bits::BitString;

use crate::config::QrngConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait for random bit sources
///
/// Implementations must be thread-safe (Send + Sync) to work with async server.
/// Callers treat every source as a fair coin; no bias correction is applied.
pub trait RandomBitSource: Send + Sync {
    /// Returns the source name (e.g., "circuit", "pseudo", "anu")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of this source
    fn description(&self) -> &'static str;

    /// Produce exactly `n` random bits
    fn bits(&self, n: usize) -> Result<BitString>;
}

/// Information about a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Source name (used in config/API)
    pub name: String,
    /// Human-readable description
    pub description: String,
}

/// Build a source by name
///
/// Falls back to the circuit simulator if the name is not recognized
pub fn get_source(name: &str, config: &QrngConfig) -> Arc<dyn RandomBitSource> {
    match name {
        "pseudo" => Arc::new(pseudo::PseudoSource::new()),
        "anu" => {
            if config.anu_api_key.is_empty() {
                Arc::new(anu::AnuSource::new())
            } else {
                Arc::new(anu::AnuSource::with_api_key(&config.anu_api_key))
            }
        }
        _ => Arc::new(circuit::CircuitSource::new(config.max_qubits_per_shot)),
    }
}

/// List all available sources with their info
pub fn available_sources() -> Vec<SourceInfo> {
    vec![
        SourceInfo {
            name: "circuit".to_string(),
            description: circuit::DESCRIPTION.to_string(),
        },
        SourceInfo {
            name: "pseudo".to_string(),
            description: pseudo::DESCRIPTION.to_string(),
        },
        SourceInfo {
            name: "anu".to_string(),
            description: anu::DESCRIPTION.to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_source_by_name() {
        let config = QrngConfig::default();
        assert_eq!(get_source("pseudo", &config).name(), "pseudo");
        assert_eq!(get_source("anu", &config).name(), "anu");
        assert_eq!(get_source("circuit", &config).name(), "circuit");
    }

    #[test]
    fn test_unknown_source_falls_back_to_circuit() {
        let config = QrngConfig::default();
        assert_eq!(get_source("nope", &config).name(), "circuit");
    }

    #[test]
    fn test_available_sources_match_registry() {
        let config = QrngConfig::default();
        for info in available_sources() {
            assert_eq!(get_source(&info.name, &config).name(), info.name);
        }
    }
}
