#![warn(clippy::all, clippy::nursery, rust_2018_idioms)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dns_stub::packet_parser::parse_response;

/// Decode a captured response datagram
#[derive(Parser)]
#[command(name = "packet_parser")]
struct Cli {
    /// File holding one raw response message
    #[arg(default_value = "response_packet")]
    path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bytes = fs::read(&cli.path).with_context(|| format!("reading {}", cli.path.display()))?;

    let packet = parse_response(&bytes)
        .with_context(|| format!("parsing {}", cli.path.display()))?;
    println!("{packet:#?}");

    Ok(())
}
