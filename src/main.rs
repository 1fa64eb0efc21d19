//! q-keygen CLI entry point
//!
//! Quantum-seeded API key issuer - CLI + web service

use q_keygen::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
