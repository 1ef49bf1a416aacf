//! Application layer - margin engine, lifecycle driver, and scanner.

mod engine;
mod lifecycle;
mod orchestrator;
mod scanner;

pub use engine::MarginEngine;
pub use lifecycle::{LifecycleDriver, LifecycleReport, TradeRequest};
pub use orchestrator::App;
pub use scanner::{ScanSummary, SettlementScanner};
