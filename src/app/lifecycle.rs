//! Position lifecycle driver: open -> match -> wait -> settle.
//!
//! One driver run is a strictly ordered pipeline; each ledger action must
//! confirm before the next begins. A violated precondition aborts the
//! remaining sequence with an error naming the failed step. Completed
//! steps are never retried.
//!
//! The driver holds no private state a restart could not recover: if the
//! expiry wait is cancelled by shutdown, the matched position is left on
//! the ledger and the settlement scanner finishes it later.

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::domain::{
    notional, unix_now, Address, Asset, MarginParams, PositionId, PositionStatus, Quantity, Side,
    Usd,
};
use crate::error::{Error, LedgerError, Result};
use crate::ledger::{CreateRequest, FuturesLedger, PriceSource};

use super::engine::MarginEngine;

/// What to trade: asset, the seller's side, size, and time to expiry.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub asset: Asset,
    pub side: Side,
    pub quantity: Quantity,
    pub duration_secs: u64,
}

fn serialize_signed_usd<S>(units: &i128, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&Usd::format_signed(*units))
}

/// Outcome of one driver run.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    pub position_id: PositionId,
    pub asset: Asset,
    pub side: Side,
    pub entry_price: Usd,
    pub notional: Usd,
    pub margin: Usd,
    pub margin_bps: u32,
    /// True when the margin came from the fixed fallback rate.
    pub fallback_margin: bool,
    pub expiry: u64,
    /// False when shutdown cancelled the expiry wait and settlement was
    /// left to the scanner.
    pub settled: bool,
    /// Seller balance change since before creation, in 1e-8 USD.
    #[serde(serialize_with = "serialize_signed_usd")]
    pub seller_delta: i128,
    /// Buyer balance change since before matching, in 1e-8 USD.
    #[serde(serialize_with = "serialize_signed_usd")]
    pub buyer_delta: i128,
}

/// Drives one position through its full lifecycle against the ledger.
///
/// Collaborator handles and parameters are passed in explicitly; there
/// are no process-wide singletons.
pub struct LifecycleDriver {
    prices: Arc<dyn PriceSource>,
    ledger: Arc<dyn FuturesLedger>,
    engine: MarginEngine,
    seller: Address,
    buyer: Address,
    /// Extra attempts allowed per action on confirmation failures only.
    confirm_retries: u32,
}

impl LifecycleDriver {
    #[must_use]
    pub fn new(
        prices: Arc<dyn PriceSource>,
        ledger: Arc<dyn FuturesLedger>,
        params: MarginParams,
        seller: Address,
        buyer: Address,
        confirm_retries: u32,
    ) -> Self {
        let engine = MarginEngine::new(prices.clone(), params);
        Self {
            prices,
            ledger,
            engine,
            seller,
            buyer,
            confirm_retries,
        }
    }

    /// Run the full lifecycle for `request`.
    ///
    /// `shutdown` cancels the expiry wait early; the position is then
    /// reported unsettled and left to the scanner.
    pub async fn run(
        &self,
        request: TradeRequest,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<LifecycleReport> {
        let expiry = unix_now() + request.duration_secs;

        // Entry price is read fresh at call time.
        let entry = self
            .prices
            .current_price(request.asset)
            .await
            .map_err(|e| e.at_step("entry-price"))?;

        let notional = notional(entry.price, request.quantity)
            .map_err(|e| Error::from(e).at_step("notional"))?;

        let quote = self.engine.quote(request.asset, notional).await;
        let margin = quote.amount;

        info!(
            asset = %request.asset,
            side = %request.side,
            entry = %entry.price,
            %notional,
            %margin,
            bps = quote.bps,
            fallback = quote.is_fallback(),
            expiry,
            "opening position"
        );

        let seller_before = self
            .ledger
            .balance_of(&self.seller)
            .await
            .map_err(|e| e.at_step("balances"))?;
        let buyer_before = self
            .ledger
            .balance_of(&self.buyer)
            .await
            .map_err(|e| e.at_step("balances"))?;

        // Create, escrowing the full margin from the seller.
        let req = CreateRequest {
            seller: self.seller.clone(),
            asset: request.asset,
            side: request.side,
            expiry,
            quantity: request.quantity,
            margin,
        };
        let id = self
            .with_confirm_retry("create", || {
                self.ledger.create_position(req.clone(), margin)
            })
            .await
            .map_err(|e| e.at_step("create"))?;

        // Verify the ledger observed the creation as we intended.
        let open = self
            .ledger
            .position(id)
            .await
            .map_err(|e| e.at_step("verify-open"))?;
        if open.status != PositionStatus::Open || open.buyer.is_some() || open.margin != margin {
            return Err(Error::from(LedgerError::Confirmation(format!(
                "created position read back as {} with buyer {:?}",
                open.status, open.buyer
            )))
            .at_step("verify-open"));
        }
        info!(%id, "position open");

        // Match from the counterparty with exactly equal margin.
        self.with_confirm_retry("match", || {
            self.ledger.match_position(id, self.buyer.clone(), margin)
        })
        .await
        .map_err(|e| e.at_step("match"))?;

        let matched = self
            .ledger
            .position(id)
            .await
            .map_err(|e| e.at_step("verify-match"))?;
        if matched.status != PositionStatus::Matched
            || matched.buyer.as_ref() != Some(&self.buyer)
        {
            return Err(Error::from(LedgerError::Confirmation(format!(
                "matched position read back as {} with buyer {:?}",
                matched.status, matched.buyer
            )))
            .at_step("verify-match"));
        }
        info!(%id, buyer = %self.buyer, "position matched");

        // Wait out the expiry, or hand off to the scanner on shutdown.
        if !self.wait_for_expiry(expiry, &mut shutdown).await {
            warn!(%id, expiry, "shutdown during expiry wait, leaving settlement to the scanner");
            return self
                .report(id, &request, entry.price, notional, &quote, expiry, false, seller_before, buyer_before)
                .await;
        }

        self.with_confirm_retry("settle", || self.ledger.settle(id))
            .await
            .map_err(|e| e.at_step("settle"))?;
        info!(%id, "position settled");

        self.report(id, &request, entry.price, notional, &quote, expiry, true, seller_before, buyer_before)
            .await
    }

    /// Sleep until `expiry` has passed. Returns false if shutdown fired first.
    async fn wait_for_expiry(&self, expiry: u64, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        let wait = expiry.saturating_sub(unix_now());
        if wait == 0 {
            return true;
        }
        info!(wait_secs = wait, "waiting for expiry");
        tokio::select! {
            () = sleep(Duration::from_secs(wait)) => true,
            _ = shutdown.changed() => false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn report(
        &self,
        id: PositionId,
        request: &TradeRequest,
        entry_price: Usd,
        notional: Usd,
        quote: &crate::domain::MarginQuote,
        expiry: u64,
        settled: bool,
        seller_before: Usd,
        buyer_before: Usd,
    ) -> Result<LifecycleReport> {
        let seller_after = self
            .ledger
            .balance_of(&self.seller)
            .await
            .map_err(|e| e.at_step("balances"))?;
        let buyer_after = self
            .ledger
            .balance_of(&self.buyer)
            .await
            .map_err(|e| e.at_step("balances"))?;

        Ok(LifecycleReport {
            position_id: id,
            asset: request.asset,
            side: request.side,
            entry_price,
            notional,
            margin: quote.amount,
            margin_bps: quote.bps,
            fallback_margin: quote.is_fallback(),
            expiry,
            settled,
            seller_delta: seller_after.signed_delta(seller_before),
            buyer_delta: buyer_after.signed_delta(buyer_before),
        })
    }

    /// Run `op`, retrying only on confirmation failures, at most
    /// `confirm_retries` extra times. Every other error propagates as-is.
    async fn with_confirm_retry<T, F, Fut>(&self, action: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(e) if e.is_confirmation_failure() && attempt < self.confirm_retries => {
                    attempt += 1;
                    warn!(action, attempt, error = %e, "action not confirmed, retrying");
                }
                other => return other,
            }
        }
    }
}
