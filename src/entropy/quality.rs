//! Statistical tests for entropy quality
//!
//! Three checks, each scored 0-1 (higher is better):
//! - Balanced (Monobit): 0s and 1s are roughly equal
//! - Uniform (Chi-Square): hex digits, the unit a key is made of, are evenly
//!   distributed
//! - Scattered (Runs): no clustering in the bit sequence

use crate::qrng::BitString;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

/// Threshold for considering a test "passed"
pub const PASS_THRESHOLD: f64 = 0.01;

/// Distinct hex digit values
const HEX_CATEGORIES: usize = 16;

/// Minimum nibbles for a meaningful chi-square over hex digits
const MIN_NIBBLES: usize = HEX_CATEGORIES * 5;

/// Results of entropy quality tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyTestResults {
    /// Monobit test result
    pub balanced: f64,

    /// Chi-square over hex digits
    pub uniform: f64,

    /// Runs test result
    pub scattered: f64,

    /// Average of all tests
    pub overall: f64,

    /// Number of bits analyzed
    pub bits_analyzed: usize,
}

impl EntropyTestResults {
    /// Check if all tests pass the threshold
    pub fn all_passed(&self) -> bool {
        self.balanced >= PASS_THRESHOLD
            && self.uniform >= PASS_THRESHOLD
            && self.scattered >= PASS_THRESHOLD
    }
}

/// Run all entropy tests on the given bits
pub fn run_all_tests(bits: &BitString) -> EntropyTestResults {
    let balanced = monobit_test(bits);
    let uniform = hex_uniformity_test(bits);
    let scattered = runs_test(bits);

    EntropyTestResults {
        balanced,
        uniform,
        scattered,
        overall: (balanced + uniform + scattered) / 3.0,
        bits_analyzed: bits.len(),
    }
}

/// Two-sided score for a standard normal deviate
fn normal_score(z: f64) -> f64 {
    (1.0 - erf(z.abs() / SQRT_2)).clamp(0.0, 1.0)
}

/// Upper-tail score for a standard normal deviate
fn upper_tail_score(z: f64) -> f64 {
    (0.5 * (1.0 - erf(z / SQRT_2))).clamp(0.0, 1.0)
}

/// Monobit (Frequency) Test - "Balanced"
pub fn monobit_test(bits: &BitString) -> f64 {
    if bits.is_empty() {
        return 0.0;
    }

    let n = bits.len() as f64;
    let ones = bits.count_ones() as f64;

    // Binomial(n, 1/2): mean n/2, std dev sqrt(n)/2
    let z = (ones - n / 2.0) / (n / 4.0).sqrt();
    normal_score(z)
}

/// Chi-Square Test - "Uniform"
///
/// Counts each of the 16 hex digit values over consecutive 4-bit groups.
pub fn hex_uniformity_test(bits: &BitString) -> f64 {
    let mut counts = [0u64; HEX_CATEGORIES];
    let mut total = 0usize;
    for nibble in bits.nibbles() {
        counts[nibble as usize] += 1;
        total += 1;
    }

    if total < MIN_NIBBLES {
        return 0.0;
    }

    let expected = total as f64 / HEX_CATEGORIES as f64;
    let chi_sq: f64 = counts
        .iter()
        .map(|&count| {
            let diff = count as f64 - expected;
            diff * diff / expected
        })
        .sum();

    // Wilson-Hilferty: (chi²/k)^(1/3) is close to normal for k degrees of freedom
    let k = (HEX_CATEGORIES - 1) as f64;
    let mean = 1.0 - 2.0 / (9.0 * k);
    let std_dev = (2.0 / (9.0 * k)).sqrt();
    let z = ((chi_sq / k).cbrt() - mean) / std_dev;

    // Only an excess of chi-square is evidence against uniformity
    upper_tail_score(z)
}

/// Runs Test - "Scattered"
///
/// Counts runs (maximal blocks of equal bits) and compares to expected.
pub fn runs_test(bits: &BitString) -> f64 {
    if bits.len() < 2 {
        return 0.0;
    }

    let n = bits.len() as f64;
    let ones = bits.count_ones() as f64;
    let zeros = n - ones;

    let pi = ones / n;
    if !(0.01..=0.99).contains(&pi) {
        return 0.0;
    }

    let mut runs = 1u64;
    let mut prev = None;
    for bit in bits.iter() {
        if let Some(p) = prev {
            if p != bit {
                runs += 1;
            }
        }
        prev = Some(bit);
    }

    let expected_runs = 2.0 * ones * zeros / n + 1.0;
    let variance = (2.0 * ones * zeros * (2.0 * ones * zeros - n)) / (n * n * (n - 1.0));
    let std_runs = variance.sqrt();

    if std_runs == 0.0 || std_runs.is_nan() {
        return 0.0;
    }

    normal_score((runs as f64 - expected_runs) / std_runs)
}

/// Error function approximation (Abramowitz and Stegun 7.1.26)
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}
