//! Entropy quality testing
//!
//! Statistical checks that a random source behaves like a fair coin before
//! its bits are trusted for keys.

pub mod quality;

pub use quality::{run_all_tests, EntropyTestResults};
