//! End-to-end lifecycle runs against the simulated oracle and ledger.

mod support;

use tokio::sync::watch;

use volmargin::app::{LifecycleDriver, SettlementScanner, TradeRequest};
use volmargin::domain::{Asset, MarginParams, PositionStatus, Quantity, Side};
use volmargin::error::Error;
use volmargin::ledger::FuturesLedger;

use support::{push_constant_history, world};

fn driver(w: &support::World, confirm_retries: u32) -> LifecycleDriver {
    LifecycleDriver::new(
        w.oracle.clone(),
        w.ledger.clone(),
        MarginParams::default(),
        w.seller.clone(),
        w.buyer.clone(),
        confirm_retries,
    )
}

fn request(duration_secs: u64) -> TradeRequest {
    TradeRequest {
        asset: Asset::Btc,
        side: Side::Long,
        quantity: Quantity::from_units(10_000_000_000_000_000), // 0.01
        duration_secs,
    }
}

#[tokio::test]
async fn full_lifecycle_settles_flat_market_at_floor_rate() {
    let w = world(10_000_000);
    // Constant prices: sigma is zero, so the rate clamps to the floor.
    push_constant_history(&w.oracle, Asset::Btc, 100_000_000, 60);

    let (_tx, rx) = watch::channel(false);
    let report = driver(&w, 0).run(request(2), rx).await.unwrap();

    assert!(report.settled);
    assert!(!report.fallback_margin);
    assert_eq!(report.margin_bps, 500);
    // 1.00 USD price * 0.01 qty = 0.01 USD notional, 5% of that escrowed.
    assert_eq!(report.notional.units(), 1_000_000);
    assert_eq!(report.margin.units(), 50_000);

    // Flat market: both parties get their escrow straight back.
    assert_eq!(report.seller_delta, 0);
    assert_eq!(report.buyer_delta, 0);

    let position = w.ledger.position(report.position_id).await.unwrap();
    assert_eq!(position.status, PositionStatus::Settled);
}

#[tokio::test]
async fn failed_history_falls_back_to_fixed_rate() {
    let w = world(10_000_000);
    push_constant_history(&w.oracle, Asset::Btc, 100_000_000, 60);
    w.oracle.set_history_failing(true);

    let (_tx, rx) = watch::channel(false);
    let report = driver(&w, 0).run(request(2), rx).await.unwrap();

    assert!(report.settled);
    assert!(report.fallback_margin);
    assert_eq!(report.margin_bps, 1000);
    assert_eq!(report.margin.units(), 100_000);
}

#[tokio::test]
async fn confirmation_failures_are_retried_within_budget() {
    let w = world(10_000_000);
    push_constant_history(&w.oracle, Asset::Btc, 100_000_000, 60);
    w.ledger.fail_next_creates(2);

    let (_tx, rx) = watch::channel(false);
    let report = driver(&w, 2).run(request(2), rx).await.unwrap();

    assert!(report.settled);
    // The two injected failures were absorbed; exactly one position exists.
    assert_eq!(w.ledger.position_count().await.unwrap(), 1);
}

#[tokio::test]
async fn exhausted_retries_fail_at_the_create_step() {
    let w = world(10_000_000);
    push_constant_history(&w.oracle, Asset::Btc, 100_000_000, 60);
    w.ledger.fail_next_creates(3);

    let (_tx, rx) = watch::channel(false);
    let err = driver(&w, 2).run(request(5), rx).await.unwrap_err();

    assert!(matches!(err, Error::Lifecycle { step: "create", .. }));
    assert_eq!(w.ledger.position_count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_price_fails_before_touching_the_ledger() {
    let w = world(10_000_000);
    // No history at all: the entry price read fails first.
    let (_tx, rx) = watch::channel(false);
    let err = driver(&w, 0).run(request(5), rx).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Lifecycle {
            step: "entry-price",
            ..
        }
    ));
    assert_eq!(w.ledger.position_count().await.unwrap(), 0);
}

#[tokio::test]
async fn shutdown_hands_matched_position_to_the_scanner() {
    let w = world(10_000_000);
    push_constant_history(&w.oracle, Asset::Btc, 100_000_000, 60);

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = driver(&w, 0).run(request(2), rx).await.unwrap();
    assert!(!report.settled);
    // Margin is escrowed on both sides but nothing has paid out yet.
    assert_eq!(report.seller_delta, -50_000);
    assert_eq!(report.buyer_delta, -50_000);

    let position = w.ledger.position(report.position_id).await.unwrap();
    assert_eq!(position.status, PositionStatus::Matched);

    // Once the expiry has genuinely passed, the scanner picks it up.
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    let scanner = SettlementScanner::new(w.ledger.clone(), std::time::Duration::from_secs(60));
    let summary = scanner.scan_once().await;
    assert_eq!(summary.settled, 1);

    let position = w.ledger.position(report.position_id).await.unwrap();
    assert_eq!(position.status, PositionStatus::Settled);
}
