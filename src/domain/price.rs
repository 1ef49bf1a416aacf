//! Oracle price samples.

use serde::Serialize;

use super::Usd;

/// The oracle keeps at most this many samples per asset (8-bit count).
pub const HISTORY_WINDOW_CAP: usize = 255;

/// One oracle sample. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    /// Price in USD fixed point (8 fractional digits).
    pub price: Usd,
    /// Unix seconds when the sample was recorded.
    pub timestamp: u64,
}

impl PricePoint {
    #[must_use]
    pub fn new(price: Usd, timestamp: u64) -> Self {
        Self { price, timestamp }
    }
}
