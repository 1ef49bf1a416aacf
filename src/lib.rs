//! Volmargin - volatility-aware margin sizing and futures lifecycle orchestration.
//!
//! This crate turns an oracle's bounded price history into a risk-scaled
//! collateral requirement and drives two-party futures positions through
//! their open -> match -> settle lifecycle against a time-boxed expiry,
//! tolerating unreliable upstream price data.
//!
//! # Architecture
//!
//! The margin pipeline is pure and runs per quote:
//!
//! - **`domain::returns`** - price history to log returns
//! - **`domain::volatility`** - log returns to a RiskMetrics EWMA sigma
//! - **`domain::margin`** - sigma to a clamped basis-points rate and an
//!   integer collateral amount, with a fixed fallback rate when history
//!   is missing or too short
//!
//! Orchestration sits on top, reaching the on-chain collaborators
//! through narrow capability traits:
//!
//! - [`ledger`] - `PriceSource` and `FuturesLedger` trait definitions
//! - [`app`] - the margin engine, the sequential lifecycle driver, and
//!   the recurring settlement scanner
//! - [`sim`] - in-process oracle and ledger with escrow accounting, used
//!   for local rehearsal and tests
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with every sizing parameter
//! - [`domain`] - fixed-point money, price samples, positions, margin math
//! - [`error`] - error taxonomy for the crate
//!
//! # Example
//!
//! ```
//! use volmargin::domain::{ewma_volatility, size_margin, MarginParams, Usd};
//!
//! let returns = [0.01, -0.02, 0.015];
//! let estimate = ewma_volatility(&returns, 0.94);
//! let quote = size_margin(Usd::from_units(1_000_000), &estimate, &MarginParams::default());
//! assert_eq!(quote.bps, 500); // low sigma clamps to the 5% floor
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod sim;
