//! Margin engine quoting against the simulated oracle.

mod support;

use std::sync::Arc;

use volmargin::app::MarginEngine;
use volmargin::domain::{unix_now, Asset, MarginParams, MarginSource, Usd};
use volmargin::sim::SimOracle;

use support::push_constant_history;

const NOTIONAL: Usd = Usd::from_units(100_000_000); // 1.00 USD

fn engine(oracle: Arc<SimOracle>) -> MarginEngine {
    MarginEngine::new(oracle, MarginParams::default())
}

#[tokio::test]
async fn empty_history_quotes_fallback() {
    let oracle = Arc::new(SimOracle::new());
    let quote = engine(oracle).quote(Asset::Btc, NOTIONAL).await;

    assert!(quote.is_fallback());
    assert_eq!(quote.bps, 1000);
    assert_eq!(quote.amount.units(), 10_000_000);
    assert!(matches!(
        quote.source,
        MarginSource::Fallback { .. }
    ));
}

#[tokio::test]
async fn single_point_is_not_enough_history() {
    let oracle = Arc::new(SimOracle::new());
    oracle.push_price(Asset::Btc, Usd::from_units(100_000_000), unix_now());

    let quote = engine(oracle).quote(Asset::Btc, NOTIONAL).await;
    assert!(quote.is_fallback());
    assert_eq!(quote.bps, 1000);
}

#[tokio::test]
async fn failed_fetch_quotes_fallback() {
    let oracle = Arc::new(SimOracle::new());
    push_constant_history(&oracle, Asset::Btc, 100_000_000, 60);
    oracle.set_history_failing(true);

    let quote = engine(oracle).quote(Asset::Btc, NOTIONAL).await;
    assert!(quote.is_fallback());
    assert_eq!(quote.bps, 1000);
}

#[tokio::test]
async fn flat_history_clamps_to_floor() {
    let oracle = Arc::new(SimOracle::new());
    push_constant_history(&oracle, Asset::Btc, 100_000_000, 60);

    let quote = engine(oracle.clone()).quote(Asset::Btc, NOTIONAL).await;
    assert!(!quote.is_fallback());
    assert_eq!(quote.bps, 500);
    assert_eq!(quote.amount, NOTIONAL.apply_bps(500));

    if let MarginSource::Volatility { sigma, samples } = quote.source {
        assert_eq!(sigma, 0.0);
        assert_eq!(samples, 59);
    } else {
        panic!("expected a volatility-sourced quote");
    }
}

#[tokio::test]
async fn wild_history_clamps_to_ceiling() {
    let oracle = Arc::new(SimOracle::new());
    // +/-20% swings: |r| ~ 0.18, far past the 20% cap at k = 3.
    let now = unix_now();
    for i in 0..60u64 {
        let price = if i % 2 == 0 { 100_000_000 } else { 120_000_000 };
        oracle.push_price(Asset::Btc, Usd::from_units(price), now - 3_600 + 60 * i);
    }

    let quote = engine(oracle).quote(Asset::Btc, NOTIONAL).await;
    assert!(!quote.is_fallback());
    assert_eq!(quote.bps, 2000);
    assert_eq!(quote.amount.units(), 20_000_000);
}

#[tokio::test]
async fn only_the_trailing_window_is_consulted() {
    let oracle = Arc::new(SimOracle::new());
    let now = unix_now();

    // Forty wild points followed by sixty flat ones. With a 60-point
    // window only the flat tail is visible, so the quote sits at the floor.
    for i in 0..40u64 {
        let price = if i % 2 == 0 { 100_000_000 } else { 150_000_000 };
        oracle.push_price(Asset::Btc, Usd::from_units(price), now - 6_000 + 60 * i);
    }
    for i in 0..60u64 {
        oracle.push_price(
            Asset::Btc,
            Usd::from_units(100_000_000),
            now - 3_600 + 60 * i,
        );
    }

    let quote = engine(oracle).quote(Asset::Btc, NOTIONAL).await;
    assert_eq!(quote.bps, 500);
}

#[tokio::test]
async fn zero_prices_in_history_are_skipped() {
    let oracle = Arc::new(SimOracle::new());
    let now = unix_now();
    oracle.push_price(Asset::Xau, Usd::from_units(100_000_000), now - 180);
    oracle.push_price(Asset::Xau, Usd::ZERO, now - 120);
    oracle.push_price(Asset::Xau, Usd::from_units(100_000_000), now - 60);

    // Both pairs touching the zero sample drop out; no returns remain,
    // sigma is zero, and the rate clamps to the floor.
    let quote = engine(oracle).quote(Asset::Xau, NOTIONAL).await;
    assert!(!quote.is_fallback());
    assert_eq!(quote.bps, 500);
    if let MarginSource::Volatility { samples, .. } = quote.source {
        assert_eq!(samples, 0);
    } else {
        panic!("expected a volatility-sourced quote");
    }
}
