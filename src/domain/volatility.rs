//! EWMA volatility estimation over a return series.

/// A per-period volatility estimate derived from a return series.
///
/// Derived, never persisted; recomputed on every margin request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityEstimate {
    /// Per-period standard deviation of returns (non-negative).
    pub sigma: f64,
    /// Number of returns the estimate was computed from.
    pub samples: usize,
}

impl VolatilityEstimate {
    /// The zero estimate returned for an empty return series.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            sigma: 0.0,
            samples: 0,
        }
    }
}

/// RiskMetrics EWMA variance over squared returns.
///
/// Seeds `sigma2 = 0` and applies, oldest to newest,
/// `sigma2 = lambda * sigma2 + (1 - lambda) * r^2`. The recurrence is
/// strictly sequential: the input must be in chronological order.
/// `lambda = 0` degenerates to `sigma = |r_last|`. An empty series yields
/// the zero estimate, not an error.
///
/// EWMA overweights recent shocks and needs only O(1) state, which suits
/// a bounded rolling oracle history.
#[must_use]
pub fn ewma_volatility(returns: &[f64], lambda: f64) -> VolatilityEstimate {
    debug_assert!((0.0..1.0).contains(&lambda));

    if returns.is_empty() {
        return VolatilityEstimate::zero();
    }
    let mut sigma2 = 0.0;
    for r in returns {
        sigma2 = lambda * sigma2 + (1.0 - lambda) * r * r;
    }
    VolatilityEstimate {
        sigma: sigma2.sqrt(),
        samples: returns.len(),
    }
}
