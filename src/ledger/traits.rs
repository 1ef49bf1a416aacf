//! Collaborator trait definitions.
//!
//! The engine reaches the price oracle and the futures ledger through
//! these narrow interfaces. Transport, finality, and storage are the
//! collaborator's concern; the engine only relies on the failures being
//! observable and on `settle` being safe against duplicate submission.

use async_trait::async_trait;

use crate::domain::{Address, Asset, Position, PositionId, PricePoint, Quantity, Side, Usd};
use crate::error::Result;

/// Read-only access to an oracle's bounded per-asset price history.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest recorded price and its timestamp.
    async fn current_price(&self, asset: Asset) -> Result<PricePoint>;

    /// Chronological history snapshot, most-recent last, bounded to the
    /// oracle's window (at most 255 samples).
    async fn history(&self, asset: Asset) -> Result<Vec<PricePoint>>;

    /// Number of samples currently held for `asset`.
    async fn history_count(&self, asset: Asset) -> Result<u8>;
}

/// Parameters for opening a position.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub seller: Address,
    pub asset: Asset,
    /// The seller's side.
    pub side: Side,
    /// Unix seconds; must be in the future at creation time.
    pub expiry: u64,
    pub quantity: Quantity,
    /// Margin each party must escrow.
    pub margin: Usd,
}

/// Side-effecting access to the futures ledger.
///
/// The ledger serializes its own mutable state; the engine must not
/// assume it is the only actor able to advance a position.
#[async_trait]
pub trait FuturesLedger: Send + Sync {
    /// Open a position, escrowing `escrow` from the seller. Fails with an
    /// escrow mismatch if `escrow != req.margin`. Returns the assigned id.
    async fn create_position(&self, req: CreateRequest, escrow: Usd) -> Result<PositionId>;

    /// Match an open position from `buyer`, escrowing an equal margin.
    /// Fails if the position is not OPEN or already has a buyer.
    async fn match_position(&self, id: PositionId, buyer: Address, escrow: Usd) -> Result<()>;

    /// Settle a matched, expired position. Rejects (does not re-execute)
    /// an already-settled id.
    async fn settle(&self, id: PositionId) -> Result<()>;

    /// Snapshot of one position.
    async fn position(&self, id: PositionId) -> Result<Position>;

    /// Number of positions ever created; ids run `1..=count`.
    async fn position_count(&self) -> Result<u64>;

    /// Free balance of an address, for realized-delta reporting.
    async fn balance_of(&self, address: &Address) -> Result<Usd>;
}
