//! Position snapshots as read back from the futures ledger.
//!
//! The ledger owns position identity and status; the engine only reads
//! snapshots and proposes transitions through lifecycle actions. Nothing
//! here is cached or mutated locally.

use std::fmt;

use serde::Serialize;

use super::{Asset, Quantity, Side, Usd};

/// A party able to escrow margin on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Address(String);

impl Address {
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Ledger-assigned position identifier. 1-based and monotonically
/// increasing; the ledger's count equals the highest assigned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PositionId(u64);

impl PositionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos-{}", self.0)
    }
}

/// Lifecycle state of a position. `Settled` is terminal; a position that
/// never matches stays `Open` indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Matched,
    Settled,
}

impl PositionStatus {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, PositionStatus::Open)
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, PositionStatus::Matched)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, PositionStatus::Settled)
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => f.write_str("OPEN"),
            PositionStatus::Matched => f.write_str("MATCHED"),
            PositionStatus::Settled => f.write_str("SETTLED"),
        }
    }
}

/// A full position snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: PositionId,
    pub seller: Address,
    pub buyer: Option<Address>,
    pub asset: Asset,
    /// The seller's side; the buyer takes the opposite exposure.
    pub side: Side,
    pub entry_price: Usd,
    /// Unix seconds after which the position may settle.
    pub expiry: u64,
    pub status: PositionStatus,
    /// Margin escrowed per party.
    pub margin: Usd,
    pub quantity: Quantity,
}

impl Position {
    /// True when the scanner should trigger settlement.
    #[must_use]
    pub fn is_settleable(&self, now: u64) -> bool {
        self.status.is_matched() && self.expiry <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_id_display() {
        assert_eq!(PositionId::new(7).to_string(), "pos-7");
    }

    #[test]
    fn status_predicates() {
        assert!(PositionStatus::Open.is_open());
        assert!(PositionStatus::Matched.is_matched());
        assert!(PositionStatus::Settled.is_settled());
        assert!(!PositionStatus::Open.is_matched());
    }

    fn snapshot(status: PositionStatus, expiry: u64) -> Position {
        Position {
            id: PositionId::new(1),
            seller: Address::from("seller"),
            buyer: None,
            asset: Asset::Btc,
            side: Side::Long,
            entry_price: Usd::from_units(100_000_000),
            expiry,
            status,
            margin: Usd::from_units(50_000),
            quantity: Quantity::from_units(10_000_000_000_000_000),
        }
    }

    #[test]
    fn settleable_requires_matched_and_expired() {
        assert!(snapshot(PositionStatus::Matched, 100).is_settleable(100));
        assert!(snapshot(PositionStatus::Matched, 100).is_settleable(200));
        assert!(!snapshot(PositionStatus::Matched, 100).is_settleable(99));
        // Expired but never matched: stays open, never settleable.
        assert!(!snapshot(PositionStatus::Open, 100).is_settleable(200));
        assert!(!snapshot(PositionStatus::Settled, 100).is_settleable(200));
    }
}
