//! Command wiring: builds the simulated world and runs the engine
//! components against it.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::domain::{unix_now, Address, Asset, Usd};
use crate::error::Result;
use crate::ledger::{CreateRequest, FuturesLedger};
use crate::sim::{seed_history, PriceFeeder, SimLedger, SimOracle};

use super::engine::MarginEngine;
use super::lifecycle::{LifecycleDriver, TradeRequest};
use super::scanner::SettlementScanner;

/// Starting prices for the seeded oracle walk.
const SEED_PRICES: [(Asset, u128); 2] = [
    (Asset::Btc, 6_500_000_000_000), // 65,000 USD
    (Asset::Xau, 240_000_000_000),   // 2,400 USD
];

/// Balance granted to each rehearsal party.
const FUNDING: Usd = Usd::from_units(100_000_000_000_000); // 1,000,000 USD

/// Main application struct.
pub struct App;

impl App {
    /// Quote margin for a notional exposure and print the result.
    pub async fn quote(config: &Config, asset: Asset, notional: Decimal) -> Result<()> {
        let (oracle, _ledger) = build_world(config);
        let notional = Usd::from_decimal(notional)?;

        let engine = MarginEngine::new(oracle, config.margin.clone().into());
        let quote = engine.quote(asset, notional).await;

        println!("{}", serde_json::to_string_pretty(&quote)?);
        Ok(())
    }

    /// Drive one position through its full lifecycle and print the report.
    pub async fn trade(
        config: &Config,
        request: TradeRequest,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let (oracle, ledger) = build_world(config);

        let seller = Address::from("seller");
        let buyer = Address::from("buyer");
        ledger.fund(&seller, FUNDING);
        ledger.fund(&buyer, FUNDING);

        // Keep prices moving while the position waits out its expiry.
        let feeder = PriceFeeder::new(
            oracle.clone(),
            request.asset,
            Duration::from_secs(config.sim.feed_interval_secs),
            config.sim.step_bps,
            config.sim.seed.wrapping_add(1),
        );
        let feeder_shutdown = shutdown.clone();
        tokio::spawn(async move { feeder.run(feeder_shutdown).await });

        let driver = LifecycleDriver::new(
            oracle,
            ledger,
            config.margin.clone().into(),
            seller,
            buyer,
            config.lifecycle.confirm_retries,
        );
        let report = driver.run(request, shutdown).await?;

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    /// Run the settlement scanner daemon over a seeded ledger.
    pub async fn scan(config: &Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        let (oracle, ledger) = build_world(config);
        seed_demo_positions(config, &oracle, &ledger).await?;

        for (asset, _) in SEED_PRICES {
            let feeder = PriceFeeder::new(
                oracle.clone(),
                asset,
                Duration::from_secs(config.sim.feed_interval_secs),
                config.sim.step_bps,
                config.sim.seed.wrapping_add(u64::from(asset as u8)),
            );
            let feeder_shutdown = shutdown.clone();
            tokio::spawn(async move { feeder.run(feeder_shutdown).await });
        }

        let scanner = SettlementScanner::new(
            ledger,
            Duration::from_secs(config.scanner.interval_secs),
        );
        scanner.run(shutdown).await;
        Ok(())
    }
}

/// Build the simulated oracle and ledger, seeding each asset's history.
fn build_world(config: &Config) -> (Arc<SimOracle>, Arc<SimLedger>) {
    let oracle = Arc::new(SimOracle::new());
    for (asset, start) in SEED_PRICES {
        let last = seed_history(
            &oracle,
            asset,
            Usd::from_units(start),
            config.sim.history_points,
            config.sim.spacing_secs,
            config.sim.step_bps,
            config.sim.seed ^ u64::from(asset as u8),
        );
        info!(%asset, price = %last, points = config.sim.history_points, "oracle seeded");
    }
    let ledger = Arc::new(SimLedger::new(oracle.clone()));
    (oracle, ledger)
}

/// Open and match a few short-dated positions so the scanner has work.
async fn seed_demo_positions(
    config: &Config,
    oracle: &Arc<SimOracle>,
    ledger: &Arc<SimLedger>,
) -> Result<()> {
    use crate::domain::{Quantity, Side};
    use rust_decimal_macros::dec;

    let seller = Address::from("seller");
    let buyer = Address::from("buyer");
    ledger.fund(&seller, FUNDING);
    ledger.fund(&buyer, FUNDING);

    let engine = MarginEngine::new(oracle.clone(), config.margin.clone().into());
    let quantity = Quantity::from_decimal(dec!(0.01))?;

    for (i, (asset, _)) in SEED_PRICES.iter().enumerate() {
        let entry = oracle
            .latest(*asset)
            .ok_or(crate::error::DataError::PriceUnavailable { asset: *asset })?;
        let notional = crate::domain::notional(entry.price, quantity)?;
        let quote = engine.quote(*asset, notional).await;

        let expiry = unix_now() + 30 * (i as u64 + 1);
        let id = ledger
            .create_position(
                CreateRequest {
                    seller: seller.clone(),
                    asset: *asset,
                    side: Side::Long,
                    expiry,
                    quantity,
                    margin: quote.amount,
                },
                quote.amount,
            )
            .await?;
        ledger.match_position(id, buyer.clone(), quote.amount).await?;
        info!(%id, %asset, expiry, margin = %quote.amount, "demo position matched");
    }
    Ok(())
}
