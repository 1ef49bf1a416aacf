#![allow(dead_code)]

//! Shared helpers for integration tests.

use std::sync::Arc;

use volmargin::domain::{unix_now, Address, Asset, Usd};
use volmargin::sim::{SimLedger, SimOracle};

/// A funded two-party world around the simulated collaborators.
pub struct World {
    pub oracle: Arc<SimOracle>,
    pub ledger: Arc<SimLedger>,
    pub seller: Address,
    pub buyer: Address,
}

/// Build a world with both parties holding `funding` USD units.
pub fn world(funding: u128) -> World {
    let oracle = Arc::new(SimOracle::new());
    let ledger = Arc::new(SimLedger::new(oracle.clone()));

    let seller = Address::from("seller");
    let buyer = Address::from("buyer");
    ledger.fund(&seller, Usd::from_units(funding));
    ledger.fund(&buyer, Usd::from_units(funding));

    World {
        oracle,
        ledger,
        seller,
        buyer,
    }
}

/// Push `points` samples at a constant price, one per minute, ending now.
/// Constant prices give zero returns, so sigma is exactly zero.
pub fn push_constant_history(oracle: &SimOracle, asset: Asset, price_units: u128, points: usize) {
    let now = unix_now();
    let first = now.saturating_sub(60 * points as u64);
    for i in 0..points {
        oracle.push_price(
            asset,
            Usd::from_units(price_units),
            first + 60 * (i as u64 + 1),
        );
    }
}
