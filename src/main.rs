//! Command-line entry point.
//!
//! Loads configuration, reads identities, and processes them one by one.

use std::path::PathBuf;

use clap::Parser;

use tx_conductor::config::{load_config, AppConfig};
use tx_conductor::observability::{logging, metrics};
use tx_conductor::{Identity, Runner, Services};

#[derive(Parser, Debug)]
#[command(name = "tx-conductor", version, about = "Runs swap, bridge and wrap modules across wallets")]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of `{"name", "private_key"}`. Falls back to the WALLETS variable.
    #[arg(short, long)]
    wallets: Option<PathBuf>,

    /// Also skip identities already in the processed record.
    #[arg(long)]
    skip_processed: bool,
}

fn read_identities(path: Option<&PathBuf>) -> Result<Vec<Identity>, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::env::var("WALLETS").map_err(|_| "no --wallets file and WALLETS is not set")?,
    };
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("tx-conductor v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let identities = read_identities(cli.wallets.as_ref())?;
    if identities.is_empty() {
        return Err("Wallets array is empty".into());
    }

    if cli.skip_processed {
        let record = tx_conductor::record::ProcessedRecord::new(&config.processed_record_path);
        config.excluded_wallets.extend(record.load().await);
    }

    tracing::info!(
        wallets = identities.len(),
        modules = config.modules.len(),
        order = ?config.order,
        "Configuration loaded"
    );

    let runner = Runner::new(Services::from_config(config));
    let summary = runner.run(identities).await;

    tracing::info!(completed = summary.completed, failed = summary.failed, "Automation job completed");
    Ok(())
}
