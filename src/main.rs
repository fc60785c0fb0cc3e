//! csv2ofx CLI
//!
//! Converts a bank-statement CSV into an OFX file using a TOML profile
//! that describes the columns, locale and account.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- profile.toml statement.csv statement.ofx
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use csv2ofx::{convert_to_file, ConvertError, Profile, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        return Err(ConvertError::MissingArgument);
    }

    let profile = Profile::load(Path::new(&args[1]))?;
    let decisions = profile.decisions()?;
    let input = fs::read_to_string(&args[2])?;
    let config = profile.into_config(input)?;

    let output = Path::new(&args[3]);
    let result = convert_to_file(&config, &decisions, output)?;

    for failure in &result.failed_rows {
        eprintln!("Skipped: {}", failure);
    }

    let stats = &result.stats;
    println!(
        "{} transactions written to {} ({} excluded, {} failed), final balance {}",
        stats.included,
        output.display(),
        stats.excluded,
        stats.failed,
        result.balance.final_balance
    );

    Ok(())
}
