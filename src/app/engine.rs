//! Margin engine: oracle history to sized collateral requirement.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    ewma_volatility, fallback_margin, log_returns, size_margin, Asset, FallbackReason,
    MarginParams, MarginQuote, Usd,
};
use crate::ledger::PriceSource;

/// Runs the history -> returns -> EWMA -> sizing pipeline for one quote.
///
/// History problems are recovered locally: a failed fetch or a history of
/// fewer than two points produces the fixed fallback quote instead of an
/// error, and the event is logged so fallback quotes stay visible in
/// telemetry.
pub struct MarginEngine {
    prices: Arc<dyn PriceSource>,
    params: MarginParams,
}

impl MarginEngine {
    #[must_use]
    pub fn new(prices: Arc<dyn PriceSource>, params: MarginParams) -> Self {
        Self { prices, params }
    }

    #[must_use]
    pub fn params(&self) -> &MarginParams {
        &self.params
    }

    /// Quote margin for `notional` exposure on `asset`.
    ///
    /// Consults at most `params.history_window` of the most recent points.
    /// Sigma is per sampling period; this engine does not scale it to the
    /// contract horizon.
    pub async fn quote(&self, asset: Asset, notional: Usd) -> MarginQuote {
        let history = match self.prices.history(asset).await {
            Ok(points) => points,
            Err(e) => {
                warn!(%asset, error = %e, "history fetch failed, using fallback margin");
                return fallback_margin(notional, FallbackReason::HistoryUnavailable, &self.params);
            }
        };

        if history.len() < 2 {
            warn!(
                %asset,
                points = history.len(),
                fallback_bps = self.params.fallback_bps,
                "not enough history, using fallback margin"
            );
            return fallback_margin(
                notional,
                FallbackReason::InsufficientHistory {
                    points: history.len(),
                },
                &self.params,
            );
        }

        let start = history.len().saturating_sub(self.params.history_window);
        let returns = log_returns(&history[start..]);
        let estimate = ewma_volatility(&returns, self.params.lambda);
        let quote = size_margin(notional, &estimate, &self.params);

        debug!(
            %asset,
            sigma = estimate.sigma,
            samples = estimate.samples,
            bps = quote.bps,
            amount = %quote.amount,
            "volatility margin quoted"
        );
        quote
    }
}
