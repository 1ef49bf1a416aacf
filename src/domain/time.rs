//! Wall-clock helpers.

/// Current unix time in whole seconds.
#[must_use]
pub fn unix_now() -> u64 {
    let ts = chrono::Utc::now().timestamp();
    u64::try_from(ts).unwrap_or(0)
}
