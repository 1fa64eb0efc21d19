//! Status command handler
//!
//! Shows server status and entropy quality of a random source.

use crate::config::Config;
use crate::entropy::run_all_tests;
use crate::error::Result;
use crate::qrng::get_source;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// Check a specific source
    #[arg(long, short = 's')]
    pub source: Option<String>,

    /// Run entropy tests with N bits
    #[arg(long, default_value = "80000")]
    pub bits: usize,

    /// Check if server is running (tries to connect)
    #[arg(long)]
    pub server: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = Config::load()?;

    // Check server status if requested
    if args.server {
        check_server_status(&config).await;
    }

    let source_name = args.source.unwrap_or_else(|| config.qrng.source.clone());
    let source = get_source(&source_name, &config.qrng);

    println!("q-keygen v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Source: {} ({})", source.name(), source.description());
    println!();

    // Sources may block on the network, keep them off the runtime threads
    let bits = args.bits;
    let sample = tokio::task::spawn_blocking(move || source.bits(bits))
        .await
        .map_err(|e| crate::error::Error::Internal(format!("Sampling task failed: {}", e)))?;

    println!("Entropy Quality Test ({} bits):", args.bits);
    match sample {
        Ok(sample) => {
            let results = run_all_tests(&sample);

            println!(
                "  Balanced (monobit):   {:.4} [{}]",
                results.balanced,
                grade(results.balanced)
            );
            println!(
                "  Uniform (chi-square): {:.4} [{}]",
                results.uniform,
                grade(results.uniform)
            );
            println!(
                "  Scattered (runs):     {:.4} [{}]",
                results.scattered,
                grade(results.scattered)
            );
            println!();
            println!(
                "  Overall: {:.4} [{}]",
                results.overall,
                if results.all_passed() { "PASS" } else { "FAIL" }
            );
        }
        Err(e) => {
            println!("  Error: Failed to sample random bits: {}", e);
        }
    }

    Ok(())
}

fn grade(score: f64) -> &'static str {
    if score >= 0.1 {
        "PASS"
    } else if score >= 0.01 {
        "MARGINAL"
    } else {
        "FAIL"
    }
}

/// Check if the server is running
async fn check_server_status(config: &Config) {
    let url = format!("http://{}/api/status", config.server_addr());

    match reqwest::get(&url).await {
        Ok(response) => {
            if response.status().is_success() {
                println!("Server: RUNNING on {}", config.server_addr());
                if let Ok(status) = response.json::<serde_json::Value>().await {
                    for field in ["version", "source", "store"] {
                        if let Some(value) = status.get(field).and_then(|v| v.as_str()) {
                            println!("  {}: {}", field, value);
                        }
                    }
                    if let Some(count) = status.get("keys_issued").and_then(|v| v.as_u64()) {
                        println!("  keys issued: {}", count);
                    }
                }
            } else {
                println!("Server: ERROR (status {})", response.status());
            }
        }
        Err(_) => {
            println!("Server: NOT RUNNING on {}", config.server_addr());
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bands() {
        assert_eq!(grade(0.5), "PASS");
        assert_eq!(grade(0.05), "MARGINAL");
        assert_eq!(grade(0.001), "FAIL");
    }
}
