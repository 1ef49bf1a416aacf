//! Simulated futures ledger with escrow accounting.
//!
//! Mirrors the escrow contract's observable behavior: ids are 1-based
//! and monotonic, margin is debited on create and match, and settlement
//! pays `margin +/- pnl` with pnl clamped to the posted margin so neither
//! party can lose more than they escrowed. All state transitions are
//! checked; a settled position rejects further settles instead of
//! re-executing. The clock can be pinned for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{unix_now, Address, Position, PositionId, PositionStatus, Usd};
use crate::error::{DataError, LedgerError, Result};
use crate::ledger::{CreateRequest, FuturesLedger};

use super::SimOracle;

#[derive(Default)]
struct State {
    positions: Vec<Position>,
    balances: HashMap<Address, Usd>,
}

/// In-memory ledger. The mutex serializes all mutation, the same
/// guarantee the real collaborator provides.
pub struct SimLedger {
    oracle: Arc<SimOracle>,
    state: Mutex<State>,
    /// 0 means wall clock; anything else pins `now`.
    now_override: AtomicU64,
    fail_creates: AtomicU32,
    fail_settles: AtomicU32,
}

impl SimLedger {
    #[must_use]
    pub fn new(oracle: Arc<SimOracle>) -> Self {
        Self {
            oracle,
            state: Mutex::new(State::default()),
            now_override: AtomicU64::new(0),
            fail_creates: AtomicU32::new(0),
            fail_settles: AtomicU32::new(0),
        }
    }

    /// Credit `amount` to `address`.
    pub fn fund(&self, address: &Address, amount: Usd) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(address.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
    }

    /// Pin the ledger clock to `now` (unix seconds).
    pub fn set_now(&self, now: u64) {
        self.now_override.store(now, Ordering::SeqCst);
    }

    /// Fail the next `n` create submissions with a confirmation error.
    pub fn fail_next_creates(&self, n: u32) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` settle submissions with a confirmation error.
    pub fn fail_next_settles(&self, n: u32) {
        self.fail_settles.store(n, Ordering::SeqCst);
    }

    fn now(&self) -> u64 {
        match self.now_override.load(Ordering::SeqCst) {
            0 => unix_now(),
            pinned => pinned,
        }
    }

    fn take_injected_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn debit(state: &mut State, address: &Address, amount: Usd) -> Result<()> {
        let balance = state.balances.entry(address.clone()).or_default();
        match balance.checked_sub(amount) {
            Some(remaining) => {
                *balance = remaining;
                Ok(())
            }
            None => Err(LedgerError::InsufficientFunds {
                address: address.clone(),
                required: amount,
                available: *balance,
            }
            .into()),
        }
    }

    fn credit(state: &mut State, address: &Address, amount: Usd) {
        let balance = state.balances.entry(address.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
    }
}

#[async_trait]
impl FuturesLedger for SimLedger {
    async fn create_position(&self, req: CreateRequest, escrow: Usd) -> Result<PositionId> {
        if Self::take_injected_failure(&self.fail_creates) {
            return Err(LedgerError::Confirmation("injected create failure".into()).into());
        }
        if escrow != req.margin {
            return Err(LedgerError::EscrowMismatch {
                required: req.margin,
                posted: escrow,
            }
            .into());
        }
        let now = self.now();
        if req.expiry <= now {
            return Err(LedgerError::Confirmation(format!(
                "expiry {} not in the future (now {})",
                req.expiry, now
            ))
            .into());
        }

        let entry_price = self
            .oracle
            .latest(req.asset)
            .ok_or(DataError::PriceUnavailable { asset: req.asset })?;

        let mut state = self.state.lock();
        Self::debit(&mut state, &req.seller, escrow)?;

        let id = PositionId::new(state.positions.len() as u64 + 1);
        state.positions.push(Position {
            id,
            seller: req.seller,
            buyer: None,
            asset: req.asset,
            side: req.side,
            entry_price: entry_price.price,
            expiry: req.expiry,
            status: PositionStatus::Open,
            margin: req.margin,
            quantity: req.quantity,
        });
        Ok(id)
    }

    async fn match_position(&self, id: PositionId, buyer: Address, escrow: Usd) -> Result<()> {
        let mut state = self.state.lock();
        let index = id.value() as usize;
        let position = state
            .positions
            .get(index.wrapping_sub(1))
            .ok_or(LedgerError::UnknownPosition { id })?
            .clone();

        if position.status != PositionStatus::Open || position.buyer.is_some() {
            return Err(LedgerError::InvalidState {
                id,
                expected: PositionStatus::Open,
                actual: position.status,
            }
            .into());
        }
        if escrow != position.margin {
            return Err(LedgerError::EscrowMismatch {
                required: position.margin,
                posted: escrow,
            }
            .into());
        }

        Self::debit(&mut state, &buyer, escrow)?;
        let position = &mut state.positions[index - 1];
        position.buyer = Some(buyer);
        position.status = PositionStatus::Matched;
        Ok(())
    }

    async fn settle(&self, id: PositionId) -> Result<()> {
        if Self::take_injected_failure(&self.fail_settles) {
            return Err(LedgerError::Confirmation("injected settle failure".into()).into());
        }

        let mut state = self.state.lock();
        let index = id.value() as usize;
        let position = state
            .positions
            .get(index.wrapping_sub(1))
            .ok_or(LedgerError::UnknownPosition { id })?
            .clone();

        if position.status != PositionStatus::Matched {
            return Err(LedgerError::InvalidState {
                id,
                expected: PositionStatus::Matched,
                actual: position.status,
            }
            .into());
        }
        let now = self.now();
        if now < position.expiry {
            return Err(LedgerError::NotExpired {
                id,
                expiry: position.expiry,
                now,
            }
            .into());
        }

        let settle_price = self
            .oracle
            .latest(position.asset)
            .ok_or(DataError::PriceUnavailable {
                asset: position.asset,
            })?
            .price;

        // Signed pnl for the seller, clamped so no party can lose more
        // than the margin they escrowed.
        let margin = position.margin.units() as i128;
        let diff = settle_price.signed_delta(position.entry_price);
        let pnl_long = diff * position.quantity.units() as i128
            / 1_000_000_000_000_000_000;
        let pnl_seller = (position.side.sign() * pnl_long).clamp(-margin, margin);

        let seller_payout = Usd::from_units((margin + pnl_seller) as u128);
        let buyer_payout = Usd::from_units((margin - pnl_seller) as u128);

        let buyer = position
            .buyer
            .clone()
            .ok_or(LedgerError::InvalidState {
                id,
                expected: PositionStatus::Matched,
                actual: position.status,
            })?;

        Self::credit(&mut state, &position.seller, seller_payout);
        Self::credit(&mut state, &buyer, buyer_payout);
        state.positions[index - 1].status = PositionStatus::Settled;
        Ok(())
    }

    async fn position(&self, id: PositionId) -> Result<Position> {
        self.state
            .lock()
            .positions
            .get((id.value() as usize).wrapping_sub(1))
            .cloned()
            .ok_or_else(|| LedgerError::UnknownPosition { id }.into())
    }

    async fn position_count(&self) -> Result<u64> {
        Ok(self.state.lock().positions.len() as u64)
    }

    async fn balance_of(&self, address: &Address) -> Result<Usd> {
        Ok(self
            .state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or(Usd::ZERO))
    }
}
