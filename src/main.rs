//! geoscore CLI.

use anyhow::Result;
use clap::Parser;
use geoscore::{Config, IpWhoisResolver, ReputationEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "geoscore")]
#[command(about = "Score IP addresses against geolocation point rules")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "geoscore.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "warn")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// IP addresses to score
    #[arg(default_value = "136.233.9.98")]
    ips: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    info!(config = %args.config.display(), "Loading configuration");
    let config = Config::load(&args.config)?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    // Build the engine
    let resolver = Arc::new(IpWhoisResolver::new(config.resolver.clone()));
    let engine = ReputationEngine::from_config(&config, resolver)?;

    // Score each IP
    for ip in &args.ips {
        match engine.reputation(ip).await {
            Ok(score) => println!("{}: {}", ip, score),
            Err(e) => eprintln!("{}: error: {}", ip, e),
        }
    }

    Ok(())
}
