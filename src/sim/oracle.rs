//! Simulated price oracle with a bounded per-asset history.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{Asset, PricePoint, Usd, HISTORY_WINDOW_CAP};
use crate::error::{DataError, Result};
use crate::ledger::PriceSource;

/// In-memory oracle. Each asset keeps a chronological ring of at most
/// [`HISTORY_WINDOW_CAP`] samples, most-recent last.
#[derive(Default)]
pub struct SimOracle {
    histories: Mutex<HashMap<Asset, VecDeque<PricePoint>>>,
    /// When set, history fetches fail, exercising the fallback path.
    fail_history: AtomicBool,
}

impl SimOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample for `asset`, evicting the oldest when full.
    pub fn push_price(&self, asset: Asset, price: Usd, timestamp: u64) {
        let mut histories = self.histories.lock();
        let history = histories.entry(asset).or_default();
        if history.len() == HISTORY_WINDOW_CAP {
            history.pop_front();
        }
        history.push_back(PricePoint::new(price, timestamp));
    }

    /// Latest recorded price, if any.
    #[must_use]
    pub fn latest(&self, asset: Asset) -> Option<PricePoint> {
        self.histories
            .lock()
            .get(&asset)
            .and_then(|h| h.back().copied())
    }

    /// Make subsequent history fetches fail (or succeed again).
    pub fn set_history_failing(&self, failing: bool) {
        self.fail_history.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PriceSource for SimOracle {
    async fn current_price(&self, asset: Asset) -> Result<PricePoint> {
        self.latest(asset)
            .ok_or_else(|| DataError::PriceUnavailable { asset }.into())
    }

    async fn history(&self, asset: Asset) -> Result<Vec<PricePoint>> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(DataError::HistoryUnavailable {
                asset,
                reason: "injected failure".into(),
            }
            .into());
        }
        Ok(self
            .histories
            .lock()
            .get(&asset)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn history_count(&self, asset: Asset) -> Result<u8> {
        let len = self
            .histories
            .lock()
            .get(&asset)
            .map_or(0, VecDeque::len);
        Ok(u8::try_from(len).unwrap_or(u8::MAX))
    }
}
