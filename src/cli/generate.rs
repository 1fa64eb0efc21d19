//! Generate command handler
//!
//! Prints freshly generated keys. Nothing is stored or mailed.

use crate::config::Config;
use crate::error::Result;
use crate::keygen::KeyEncoder;
use crate::qrng::get_source;
use clap::Args;

/// Generate command arguments
#[derive(Args)]
pub struct GenerateArgs {
    /// Key length in hex characters
    #[arg(long, short = 'l')]
    pub length: Option<usize>,

    /// Random source
    #[arg(long, short = 's')]
    pub source: Option<String>,

    /// Number of keys to generate
    #[arg(long, short = 'n', default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,
}

/// Run the generate command
pub fn run(args: GenerateArgs) -> Result<()> {
    let config = Config::load()?;

    let length = args.length.unwrap_or(config.keys.length);
    let source_name = args.source.unwrap_or_else(|| config.qrng.source.clone());
    let encoder = KeyEncoder::new(get_source(&source_name, &config.qrng), length);

    println!("--- Quantum-Powered API Key Generator ---");
    println!("Source: {}", encoder.source_name());
    println!();

    for _ in 0..args.count {
        let key = encoder.encode()?;
        println!("Generated API Key: {}", key);
    }

    println!("Key Length: {}", encoder.length());

    Ok(())
}
