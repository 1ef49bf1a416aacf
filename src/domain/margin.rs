//! Volatility-scaled margin sizing.
//!
//! `k * sigma` is a fraction per sampling period; if the contract horizon
//! differs from the sampling period, callers must scale sigma (e.g. by
//! `sqrt(horizon_in_periods)`) before sizing. No scaling happens here.

use std::fmt;

use serde::Serialize;

use super::{Usd, VolatilityEstimate};

/// Margin sizing parameters. All externally supplied, never computed.
#[derive(Debug, Clone, Copy)]
pub struct MarginParams {
    /// Risk multiplier applied to sigma (~99.7% coverage for normal returns).
    pub k: f64,
    /// Lower clamp on the margin rate, in basis points.
    pub min_bps: u32,
    /// Upper clamp on the margin rate, in basis points.
    pub max_bps: u32,
    /// Fixed rate used when history is missing or too short.
    pub fallback_bps: u32,
    /// EWMA decay factor, in `[0, 1)`.
    pub lambda: f64,
    /// Most-recent history points consulted per quote.
    pub history_window: usize,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            k: 3.0,
            min_bps: 500,   // 5%
            max_bps: 2000,  // 20%
            fallback_bps: 1000, // 10%
            lambda: 0.94,
            history_window: 60,
        }
    }
}

/// Why a quote fell back to the fixed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer than two usable price points.
    InsufficientHistory { points: usize },
    /// The history fetch itself failed.
    HistoryUnavailable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InsufficientHistory { points } => {
                write!(f, "insufficient history ({points} points)")
            }
            FallbackReason::HistoryUnavailable => f.write_str("history unavailable"),
        }
    }
}

/// How a quote's rate was derived. Fallback quotes must stay
/// distinguishable from volatility-derived ones in output and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MarginSource {
    Volatility { sigma: f64, samples: usize },
    Fallback { reason: FallbackReason },
}

/// A sized collateral requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginQuote {
    /// Collateral amount, `notional * bps / 10_000` in integer arithmetic.
    pub amount: Usd,
    /// Margin rate in basis points.
    pub bps: u32,
    /// Volatility-derived or fallback.
    pub source: MarginSource,
}

impl MarginQuote {
    /// True when the fixed fallback rate was used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, MarginSource::Fallback { .. })
    }
}

/// Size margin from a volatility estimate.
///
/// `raw_bps = round(k * sigma * 10_000)` is the single place floating
/// point is converted to an integer rate; everything downstream is
/// integer-only. The rate is clamped to `[min_bps, max_bps]`.
#[must_use]
pub fn size_margin(
    notional: Usd,
    estimate: &VolatilityEstimate,
    params: &MarginParams,
) -> MarginQuote {
    let raw = (params.k * estimate.sigma * 10_000.0).round();
    let raw_bps = if raw.is_finite() && raw >= 0.0 {
        if raw > f64::from(u32::MAX) {
            u32::MAX
        } else {
            raw as u32
        }
    } else {
        0
    };
    let bps = raw_bps.clamp(params.min_bps, params.max_bps);

    MarginQuote {
        amount: notional.apply_bps(bps),
        bps,
        source: MarginSource::Volatility {
            sigma: estimate.sigma,
            samples: estimate.samples,
        },
    }
}

/// Size margin at the fixed fallback rate, bypassing the volatility path.
#[must_use]
pub fn fallback_margin(notional: Usd, reason: FallbackReason, params: &MarginParams) -> MarginQuote {
    MarginQuote {
        amount: notional.apply_bps(params.fallback_bps),
        bps: params.fallback_bps,
        source: MarginSource::Fallback { reason },
    }
}
