//! Ledger-agnostic domain logic: assets, fixed-point money, price
//! history, positions, and the margin math pipeline.

pub mod error;

mod asset;
mod margin;
mod money;
mod position;
mod price;
mod returns;
mod time;
mod volatility;

// Core domain types
pub use asset::{Asset, Side};
pub use money::{notional, Quantity, Usd, QUANTITY_DECIMALS, USD_DECIMALS};
pub use position::{Address, Position, PositionId, PositionStatus};
pub use price::{PricePoint, HISTORY_WINDOW_CAP};

// Margin math pipeline
pub use margin::{FallbackReason, MarginParams, MarginQuote, MarginSource};
pub use returns::log_returns;
pub use volatility::{ewma_volatility, VolatilityEstimate};

pub use margin::{fallback_margin, size_margin};
pub use time::unix_now;
