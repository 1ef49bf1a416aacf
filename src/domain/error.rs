//! Domain validation errors for core domain types.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// A fixed-point conversion was given a negative or out-of-range value.
    #[error("invalid fixed-point amount: {reason}")]
    InvalidAmount { reason: String },

    /// `price * quantity` overflowed the 128-bit notional computation.
    #[error("notional overflow: price {price} * quantity {quantity}")]
    NotionalOverflow { price: String, quantity: String },
}
