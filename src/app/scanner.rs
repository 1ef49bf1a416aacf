//! Recurring settlement scanner.
//!
//! Every tick enumerates all ledger positions and settles those that are
//! matched and past expiry. One id's failure never aborts the scan; a
//! position that fails in one tick is simply seen again on the next.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{unix_now, PositionId};
use crate::ledger::FuturesLedger;

/// Counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Positions examined.
    pub scanned: u64,
    /// Settlements triggered successfully.
    pub settled: u64,
    /// Settle attempts that lost a race (already settled elsewhere, or
    /// the ledger's clock disagreed on expiry). Benign.
    pub races: u64,
    /// Snapshot fetches or settle attempts that failed hard.
    pub failures: u64,
}

/// Scans the ledger on a fixed interval and settles expired matches.
///
/// Runs independently of any in-flight lifecycle driver. Another actor
/// may settle a position first; the resulting "not in MATCHED state"
/// rejection is treated as benign.
pub struct SettlementScanner {
    ledger: Arc<dyn FuturesLedger>,
    interval: Duration,
}

impl SettlementScanner {
    #[must_use]
    pub fn new(ledger: Arc<dyn FuturesLedger>, interval: Duration) -> Self {
        Self { ledger, interval }
    }

    /// Tick until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "settlement scanner started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.scan_once().await;
                    if summary.settled > 0 || summary.failures > 0 {
                        info!(
                            scanned = summary.scanned,
                            settled = summary.settled,
                            races = summary.races,
                            failures = summary.failures,
                            "settlement scan complete"
                        );
                    } else {
                        debug!(scanned = summary.scanned, "settlement scan idle");
                    }
                }
                _ = shutdown.changed() => {
                    info!("settlement scanner stopping");
                    return;
                }
            }
        }
    }

    /// One pass over ids `1..=position_count()`.
    pub async fn scan_once(&self) -> ScanSummary {
        let mut summary = ScanSummary::default();

        let count = match self.ledger.position_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "position count unavailable, skipping scan");
                summary.failures += 1;
                return summary;
            }
        };

        let now = unix_now();
        for raw_id in 1..=count {
            let id = PositionId::new(raw_id);
            summary.scanned += 1;

            let position = match self.ledger.position(id).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(%id, error = %e, "failed to fetch position, continuing scan");
                    summary.failures += 1;
                    continue;
                }
            };

            if !position.is_settleable(now) {
                continue;
            }

            match self.ledger.settle(id).await {
                Ok(()) => {
                    info!(%id, expiry = position.expiry, "settled expired position");
                    summary.settled += 1;
                }
                Err(e) if e.is_benign_settle_race() => {
                    debug!(%id, error = %e, "settle raced, skipping");
                    summary.races += 1;
                }
                Err(e) => {
                    warn!(%id, error = %e, "settle failed, will retry next tick");
                    summary.failures += 1;
                }
            }
        }

        summary
    }
}
