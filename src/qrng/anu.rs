//! ANU Quantum Random Number Generator source
//!
//! Uses the Australian National University's QRNG API as a hardware entropy
//! source in place of the circuit simulator.
//! API documentation: https://qrng.anu.edu.au/contact/api-documentation/
//!
//! Two tiers:
//! - Free: https://qrng.anu.edu.au/API/jsonI.php (rate limited)
//! - Paid: https://api.quantumnumbers.anu.edu.au (requires API key)
//!
//! If an API key is provided, the paid endpoint is used automatically.

use crate::constants::api::{ANU_FREE_URL, ANU_PAID_URL};
use crate::error::{Error, Result};
use crate::qrng::{BitString, RandomBitSource};
use serde::Deserialize;
use std::sync::mpsc;
use std::thread;

pub(crate) const DESCRIPTION: &str =
    "Australian National University Quantum Random Number Generator";

const MAX_BLOCK_SIZE: usize = 1024; // Maximum bytes per request

/// ANU QRNG source
///
/// Note: HTTP requests run in a separate thread to avoid conflicts with
/// tokio's async runtime.
#[derive(Debug, Default)]
pub struct AnuSource {
    api_key: Option<String>,
}

/// Which API tier is being used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnuTier {
    Free,
    Paid,
}

/// ANU API response for uint8 type
///
/// Example: `{"success": true, "type": "uint8", "length": "5", "data": [172, 216, 180, 138, 46]}`
#[derive(Debug, Deserialize)]
struct AnuResponse {
    success: bool,
    #[serde(default)]
    data: Option<Vec<u8>>,
    /// Present on error responses: `{"success": false, "message": "..."}`
    #[serde(default)]
    message: Option<String>,
}

impl AnuSource {
    pub fn new() -> Self {
        Self { api_key: None }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    /// Get which API tier is being used
    pub fn tier(&self) -> AnuTier {
        match &self.api_key {
            Some(key) if !key.is_empty() => AnuTier::Paid,
            _ => AnuTier::Free,
        }
    }

    fn request_url(&self, count: usize) -> String {
        match self.tier() {
            AnuTier::Paid => format!("{}?length={}&type=uint8", ANU_PAID_URL, count),
            AnuTier::Free => format!("{}?length={}&type=uint8", ANU_FREE_URL, count),
        }
    }

    /// Fetch one block of random bytes from the ANU API
    fn fetch_block(&self, count: usize) -> Result<Vec<u8>> {
        let count = count.min(MAX_BLOCK_SIZE);
        let url = self.request_url(count);
        let api_key = self.api_key.clone().filter(|k| !k.is_empty());

        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = (|| -> Result<Vec<u8>> {
                let client = reqwest::blocking::Client::builder()
                    .timeout(std::time::Duration::from_secs(30))
                    .build()
                    .map_err(|e| Error::Qrng(format!("Failed to build HTTP client: {}", e)))?;

                let mut request = client.get(&url);
                if let Some(key) = api_key {
                    request = request.header("x-api-key", key);
                }

                let response = request
                    .send()
                    .map_err(|e| Error::Qrng(format!("ANU API request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::Qrng(format!(
                        "ANU API returned status: {}",
                        response.status()
                    )));
                }

                let body: AnuResponse = response
                    .json()
                    .map_err(|e| Error::Qrng(format!("Failed to parse ANU response: {}", e)))?;

                parse_block(body, count)
            })();

            let _ = tx.send(result);
        });

        rx.recv()
            .map_err(|_| Error::Qrng("Failed to receive response from HTTP thread".to_string()))?
    }
}

fn parse_block(body: AnuResponse, expected: usize) -> Result<Vec<u8>> {
    if !body.success {
        let msg = body.message.unwrap_or_else(|| "Unknown error".to_string());
        return Err(Error::Qrng(format!("ANU API error: {}", msg)));
    }

    let data = body
        .data
        .ok_or_else(|| Error::Qrng("ANU API returned no data".to_string()))?;

    if data.len() < expected {
        return Err(Error::Qrng(format!(
            "ANU API returned {} bytes, expected {}",
            data.len(),
            expected
        )));
    }
    Ok(data)
}

impl RandomBitSource for AnuSource {
    fn name(&self) -> &'static str {
        "anu"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn bits(&self, n: usize) -> Result<BitString> {
        if n == 0 {
            return Ok(BitString::new());
        }

        let byte_count = n.div_ceil(8);
        let mut bytes = Vec::with_capacity(byte_count);

        while bytes.len() < byte_count {
            let batch = (byte_count - bytes.len()).min(MAX_BLOCK_SIZE);
            bytes.extend(self.fetch_block(batch)?.into_iter().take(batch));
        }

        Ok(BitString::from_bytes(&bytes, n))
    }
}
