//! Quantum circuit simulator source
//!
//! Produces random bits the way a small quantum computer would: every qubit of
//! a register starts in |0⟩, a Hadamard gate puts it into an equal
//! superposition, and one measurement shot collapses the register into a bit
//! string. Registers are limited to `max_qubits` (the simulated hardware
//! ceiling), so large requests are split into several shots.
//!
//! Only single-qubit gates are used, so the register is simulated as a product
//! of independent qubit states rather than a full 2^n state vector.

use crate::constants::circuit::MAX_QUBITS_PER_SHOT;
use crate::error::{Error, Result};
use crate::qrng::{BitString, RandomBitSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Mutex;
use tracing::debug;

pub(crate) const DESCRIPTION: &str =
    "Simulated quantum circuit (Hadamard superposition + measurement)";

/// State of a single qubit with real amplitudes
#[derive(Debug, Clone, Copy, PartialEq)]
struct Qubit {
    zero: f64,
    one: f64,
}

impl Qubit {
    fn ground() -> Self {
        Self { zero: 1.0, one: 0.0 }
    }

    fn hadamard(&mut self) {
        let (a, b) = (self.zero, self.one);
        self.zero = (a + b) * FRAC_1_SQRT_2;
        self.one = (a - b) * FRAC_1_SQRT_2;
    }

    fn probability_one(&self) -> f64 {
        (self.one * self.one).clamp(0.0, 1.0)
    }
}

/// A register of qubits with one classical bit per qubit
#[derive(Debug, Clone)]
pub struct Circuit {
    qubits: Vec<Qubit>,
}

impl Circuit {
    /// Create a circuit with `n` qubits, all in |0⟩
    pub fn new(n: usize) -> Self {
        Self {
            qubits: vec![Qubit::ground(); n],
        }
    }

    /// Apply a Hadamard gate to every qubit
    pub fn h_all(&mut self) -> &mut Self {
        for qubit in &mut self.qubits {
            qubit.hadamard();
        }
        self
    }

    /// Probability that measuring qubit `index` yields 1
    pub fn probability_one(&self, index: usize) -> Option<f64> {
        self.qubits.get(index).map(Qubit::probability_one)
    }

    /// Measure every qubit once
    ///
    /// The result is read out like a classical register: classical bit 0
    /// (the measurement of qubit 0) is the rightmost character.
    pub fn measure_all<R: Rng>(&self, rng: &mut R) -> BitString {
        self.qubits
            .iter()
            .rev()
            .map(|q| rng.gen_bool(q.probability_one()))
            .collect()
    }
}

/// Circuit simulator bit source
pub struct CircuitSource {
    max_qubits: usize,
    rng: Mutex<StdRng>,
}

impl CircuitSource {
    /// Create a simulator source with the given register ceiling
    ///
    /// A ceiling of 0 or above the simulated hardware limit is clamped.
    pub fn new(max_qubits: usize) -> Self {
        Self::with_rng(max_qubits, StdRng::from_entropy())
    }

    /// Create a simulator whose measurement outcomes are reproducible
    pub fn with_seed(max_qubits: usize, seed: u64) -> Self {
        Self::with_rng(max_qubits, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_qubits: usize, rng: StdRng) -> Self {
        Self {
            max_qubits: max_qubits.clamp(1, MAX_QUBITS_PER_SHOT),
            rng: Mutex::new(rng),
        }
    }

    /// Largest register measured in one shot
    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    /// Run one shot of an `n`-qubit Hadamard circuit
    fn run_shot(&self, n: usize) -> Result<BitString> {
        if n == 0 || n > self.max_qubits {
            return Err(Error::Qrng(format!(
                "Circuit needs 1..={} qubits, got {}",
                self.max_qubits, n
            )));
        }

        let mut circuit = Circuit::new(n);
        circuit.h_all();

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::Qrng("Simulator RNG lock poisoned".to_string()))?;
        Ok(circuit.measure_all(&mut *rng))
    }
}

impl Default for CircuitSource {
    fn default() -> Self {
        Self::new(MAX_QUBITS_PER_SHOT)
    }
}

impl RandomBitSource for CircuitSource {
    fn name(&self) -> &'static str {
        "circuit"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn bits(&self, n: usize) -> Result<BitString> {
        let mut result = BitString::with_capacity(n);
        let mut shots = 0usize;

        while result.len() < n {
            let qubits = self.max_qubits.min(n - result.len());
            let chunk = self.run_shot(qubits)?;
            result.append(&chunk);
            shots += 1;
        }

        debug!(bits = n, shots, "Measured circuit");
        Ok(result)
    }
}
