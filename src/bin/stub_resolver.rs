#![warn(clippy::all, clippy::nursery, rust_2018_idioms)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dns_stub::packet_parser::QueryType;
use dns_stub::stub_resolver::{resolve, ResolverConfig};

#[derive(Parser)]
#[command(name = "stub_resolver")]
#[command(about = "Send one recursive query and print the answer section")]
struct Cli {
    /// Domain name to resolve
    domain: String,

    /// Record type: A, a number, or TYPE<n>
    #[arg(short = 't', long, default_value = "A")]
    qtype: QueryType,

    /// Resolver address
    #[arg(short = 's', long, default_value = "8.8.8.8:53")]
    server: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) {
    let filter = level.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = ResolverConfig {
        server: cli.server,
        ..ResolverConfig::default()
    };
    info!(server = %config.server, domain = %cli.domain, qtype = %cli.qtype, "resolving");

    let response = resolve(&config, &cli.domain, cli.qtype)
        .with_context(|| format!("resolving {} via {}", cli.domain, config.server))?;

    let header = &response.header;
    println!("Header:");
    println!("  id: {}", header.id);
    println!("  flags: {:#06x} ({:?})", header.flags, header.rescode());
    println!("  questions: {}", header.questions);
    println!("  answers: {}", header.answers);
    println!("  authorities: {}", header.authorities);
    println!("  additional: {}", header.additional);
    println!();

    println!("Question:");
    println!(
        "  {} {} class {}",
        response.question.name, response.question.qtype, response.question.class
    );
    println!();

    println!("Answers:");
    for record in &response.answers {
        println!("  {record}");
    }

    Ok(())
}
