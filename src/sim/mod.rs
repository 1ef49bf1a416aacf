//! In-process collaborators for local rehearsal and tests.
//!
//! [`SimOracle`] and [`SimLedger`] implement the capability traits with
//! full escrow accounting and a programmable clock, standing in for the
//! on-chain oracle and escrow contracts. Both support scripted failure
//! injection.

mod feeder;
mod ledger;
mod oracle;

pub use feeder::{seed_history, PriceFeeder};
pub use ledger::SimLedger;
pub use oracle::SimOracle;
