use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::{Address, Asset, PositionId, PositionStatus, Usd};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Price-data availability errors.
///
/// These are recoverable: the margin engine answers them with the
/// fixed fallback quote rather than failing the caller.
#[derive(Error, Debug, Clone)]
pub enum DataError {
    #[error("price history unavailable for {asset}: {reason}")]
    HistoryUnavailable { asset: Asset, reason: String },

    #[error("no current price for {asset}")]
    PriceUnavailable { asset: Asset },
}

/// Errors surfaced by the futures ledger collaborator.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("unknown position {id}")]
    UnknownPosition { id: PositionId },

    #[error("position {id} is {actual}, expected {expected}")]
    InvalidState {
        id: PositionId,
        expected: PositionStatus,
        actual: PositionStatus,
    },

    #[error("position {id} not yet expired (expiry {expiry}, now {now})")]
    NotExpired { id: PositionId, expiry: u64, now: u64 },

    #[error("escrow mismatch: required {required}, posted {posted}")]
    EscrowMismatch { required: Usd, posted: Usd },

    #[error("insufficient funds for {address}: required {required}, available {available}")]
    InsufficientFunds {
        address: Address,
        required: Usd,
        available: Usd,
    },

    #[error("action not confirmed: {0}")]
    Confirmation(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A lifecycle driver step failed; the remaining sequence was aborted.
    #[error("lifecycle step '{step}' failed: {source}")]
    Lifecycle {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an error with the lifecycle step that produced it.
    #[must_use]
    pub fn at_step(self, step: &'static str) -> Self {
        Error::Lifecycle {
            step,
            source: Box::new(self),
        }
    }

    /// True when a settle attempt lost a race with another settler
    /// (already settled, or the ledger's clock has not reached expiry yet).
    /// The scanner treats these as benign and moves on.
    #[must_use]
    pub fn is_benign_settle_race(&self) -> bool {
        matches!(
            self,
            Error::Ledger(LedgerError::InvalidState { .. })
                | Error::Ledger(LedgerError::NotExpired { .. })
        )
    }

    /// True when the failure was a missing confirmation, the only error
    /// kind the lifecycle driver will retry.
    #[must_use]
    pub fn is_confirmation_failure(&self) -> bool {
        matches!(self, Error::Ledger(LedgerError::Confirmation(_)))
    }
}
