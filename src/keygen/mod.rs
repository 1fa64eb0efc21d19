//! API key encoding
//!
//! Turns raw random bits into a fixed-width lowercase hexadecimal key. Each
//! hex digit consumes 4 bits; the bit string is read as one big-endian
//! integer, rendered in hex, and left-padded with zeros to the full width so
//! keys whose leading bits are zero keep their length.

use crate::constants::keys::BITS_PER_HEX_DIGIT;
use crate::error::{Error, Result};
use crate::qrng::{BitString, RandomBitSource};
use std::sync::Arc;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Generate one key of `length` hex characters from `source`
pub fn encode_key(source: &dyn RandomBitSource, length: usize) -> Result<String> {
    if length == 0 {
        return Err(Error::InvalidKeyLength(
            "key length must be positive".to_string(),
        ));
    }

    let wanted = length * BITS_PER_HEX_DIGIT;
    let bits = source.bits(wanted)?;
    if bits.len() != wanted {
        return Err(Error::Qrng(format!(
            "Source '{}' returned {} bits, expected {}",
            source.name(),
            bits.len(),
            wanted
        )));
    }

    Ok(bits_to_hex(&bits, length))
}

/// Render `bits` as a big-endian integer in hex, zero-padded on the left to `width`
fn bits_to_hex(bits: &BitString, width: usize) -> String {
    let digits: String = bits
        .nibbles()
        .skip_while(|n| *n == 0)
        .map(|n| char::from(HEX_DIGITS[n as usize]))
        .collect();

    format!("{:0>width$}", digits, width = width)
}

/// Check that `key` has exactly `length` lowercase hex characters
pub fn is_well_formed(key: &str, length: usize) -> bool {
    key.len() == length && key.bytes().all(|b| HEX_DIGITS.contains(&b))
}

/// A random source paired with the key width it produces
#[derive(Clone)]
pub struct KeyEncoder {
    source: Arc<dyn RandomBitSource>,
    length: usize,
}

impl KeyEncoder {
    pub fn new(source: Arc<dyn RandomBitSource>, length: usize) -> Self {
        Self { source, length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Produce one candidate key
    pub fn encode(&self) -> Result<String> {
        encode_key(self.source.as_ref(), self.length)
    }
}

impl std::fmt::Debug for KeyEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEncoder")
            .field("source", &self.source.name())
            .field("length", &self.length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrng::circuit::CircuitSource;
    use crate::qrng::pseudo::SeededPseudoSource;
    use std::collections::HashSet;

    /// Replays a fixed bit pattern, e.g. "0101"
    struct FixedSource(&'static str);

    impl RandomBitSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn description(&self) -> &'static str {
            "fixed bits"
        }

        fn bits(&self, n: usize) -> Result<BitString> {
            Ok(self.0.chars().cycle().take(n).map(|c| c == '1').collect())
        }
    }

    /// Always returns one bit too few
    struct ShortSource;

    impl RandomBitSource for ShortSource {
        fn name(&self) -> &'static str {
            "short"
        }

        fn description(&self) -> &'static str {
            "short"
        }

        fn bits(&self, n: usize) -> Result<BitString> {
            Ok((0..n.saturating_sub(1)).map(|_| true).collect())
        }
    }

    #[test]
    fn test_default_length_key_shape() {
        let source = CircuitSource::with_seed(24, 1);
        let key = encode_key(&source, 52).unwrap();
        assert_eq!(key.len(), 52);
        assert!(is_well_formed(&key, 52));
    }

    #[test]
    fn test_many_lengths() {
        let source = SeededPseudoSource::new(3);
        for length in 1..=70 {
            let key = encode_key(&source, length).unwrap();
            assert!(is_well_formed(&key, length), "bad key {:?}", key);
        }
    }

    #[test]
    fn test_all_zero_bits_pad_to_width() {
        let source = FixedSource("0");
        assert_eq!(encode_key(&source, 8).unwrap(), "00000000");
    }

    #[test]
    fn test_leading_zero_nibbles_are_kept() {
        // 0000 0000 1010 1111
        let source = FixedSource("0000000010101111");
        assert_eq!(encode_key(&source, 4).unwrap(), "00af");
    }

    #[test]
    fn test_all_ones_is_lowercase_f() {
        let source = FixedSource("1");
        assert_eq!(encode_key(&source, 5).unwrap(), "fffff");
    }

    #[test]
    fn test_zero_length_rejected() {
        let source = SeededPseudoSource::new(3);
        assert!(matches!(
            encode_key(&source, 0),
            Err(Error::InvalidKeyLength(_))
        ));
    }

    #[test]
    fn test_short_source_rejected() {
        assert!(matches!(encode_key(&ShortSource, 4), Err(Error::Qrng(_))));
    }

    #[test]
    fn test_keys_do_not_collide() {
        let encoder = KeyEncoder::new(Arc::new(CircuitSource::with_seed(24, 11)), 52);
        let keys: HashSet<String> = (0..2_000).map(|_| encoder.encode().unwrap()).collect();
        assert_eq!(keys.len(), 2_000);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("0a9f", 4));
        assert!(!is_well_formed("0A9F", 4));
        assert!(!is_well_formed("0a9", 4));
        assert!(!is_well_formed("0a9g", 4));
    }
}
