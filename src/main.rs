use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::signal;
use tracing::{error, info};

use volmargin::app::{App, TradeRequest};
use volmargin::config::Config;
use volmargin::domain::{Asset, Quantity, Side};

#[derive(Parser)]
#[command(name = "volmargin", about = "Volatility-aware margin engine and futures lifecycle bot", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a margin quote for a notional USD exposure.
    Quote {
        /// Asset to quote against (btc, xau).
        #[arg(long)]
        asset: Asset,
        /// Notional exposure in USD, e.g. 650.
        #[arg(long)]
        notional: Decimal,
    },
    /// Drive one position through open, match, expiry wait, and settle.
    Trade {
        /// Asset to trade (btc, xau).
        #[arg(long)]
        asset: Asset,
        /// The seller's side (long, short).
        #[arg(long, default_value = "long")]
        side: Side,
        /// Quantity in asset units, e.g. 0.01.
        #[arg(long, default_value = "0.01")]
        quantity: Decimal,
        /// Seconds until expiry.
        #[arg(long, default_value_t = 60)]
        duration: u64,
    },
    /// Run the settlement scanner daemon.
    Scan,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("volmargin starting");

    // Ctrl-C flips the shutdown signal; in-flight waits hand their
    // positions off to the scanner instead of orphaning them.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let result = match cli.command {
        Command::Quote { asset, notional } => App::quote(&config, asset, notional).await,
        Command::Trade {
            asset,
            side,
            quantity,
            duration,
        } => match Quantity::from_decimal(quantity) {
            Ok(quantity) => {
                let request = TradeRequest {
                    asset,
                    side,
                    quantity,
                    duration_secs: duration,
                };
                App::trade(&config, request, shutdown_rx).await
            }
            Err(e) => Err(e.into()),
        },
        Command::Scan => App::scan(&config, shutdown_rx).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    info!("volmargin stopped");
}
