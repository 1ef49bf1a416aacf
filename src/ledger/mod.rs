//! Capability traits for the on-chain collaborators.

mod traits;

pub use traits::{CreateRequest, FuturesLedger, PriceSource};
