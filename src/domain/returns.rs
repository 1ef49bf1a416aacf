//! Log-return calculation over an oracle history snapshot.

use super::PricePoint;

/// Convert a chronological price history into log returns.
///
/// For each adjacent pair with both prices strictly positive, emits
/// `ln(p_i / p_{i-1})`. Pairs containing a non-positive price are skipped
/// rather than emitted as zero, so the output may be shorter than
/// `len - 1`. Histories of length 0 or 1 yield an empty series.
#[must_use]
pub fn log_returns(history: &[PricePoint]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(history.len().saturating_sub(1));
    for pair in history.windows(2) {
        let prev = pair[0].price.to_f64();
        let curr = pair[1].price.to_f64();
        if prev > 0.0 && curr > 0.0 {
            returns.push((curr / prev).ln());
        }
    }
    returns
}
