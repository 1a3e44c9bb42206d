//! Unified error types for the ledger engine.
//!
//! Every rejection carries enough field-level detail for the caller to
//! render an actionable message. All failures are synchronous and typed;
//! nothing is retried internally and no operation partially applies.

use crate::entities::sale::SaleStatus;
use thiserror::Error;

/// Unified error type for all ledger operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file missing, malformed, or semantically invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the configuration problem
        message: String,
    },

    /// A field failed input validation
    #[error("Validation failed for `{field}`: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// An amount was zero, negative, or not finite where a positive one is required
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// No account exists (or is active) under the given code
    #[error("Account not found: {code}")]
    AccountNotFound {
        /// The account code that failed to resolve
        code: String,
    },

    /// No sale exists with the given identifier
    #[error("Sale not found: {id}")]
    SaleNotFound {
        /// The sale identifier that failed to resolve
        id: i64,
    },

    /// An expense or transfer would drive the source account negative
    #[error(
        "Insufficient balance in `{account}`: available {available:.2}, requested {requested:.2}"
    )]
    InsufficientBalance {
        /// Code of the account short on funds
        account: String,
        /// Current balance of that account
        available: f64,
        /// Amount the operation tried to take out
        requested: f64,
    },

    /// A transfer named the same account as source and destination
    #[error("Transfer source and destination are the same account: {account}")]
    SameAccount {
        /// The duplicated account code
        account: String,
    },

    /// A distribution was already posted for this sale
    #[error("Distribution already posted for sale {sale_id}")]
    DuplicatePosting {
        /// The sale whose entries already exist
        sale_id: i64,
    },

    /// A payment would overshoot the sale's outstanding debt
    #[error("Payment of {amount:.2} exceeds outstanding debt of {debt:.2} on sale {sale_id}")]
    PaymentExceedsDebt {
        /// The sale being paid
        sale_id: i64,
        /// The rejected payment amount
        amount: f64,
        /// The debt still outstanding
        debt: f64,
    },

    /// A sale status change violated the allowed transition order
    #[error("Invalid status transition from {from} to {to} on sale {sale_id}")]
    InvalidTransition {
        /// The sale whose transition was rejected
        sale_id: i64,
        /// Status the sale currently holds
        from: SaleStatus,
        /// Status the caller tried to move to
        to: SaleStatus,
    },

    /// A stored account balance diverged from the fold over its entries
    #[error(
        "Balance drift on account `{account}`: stored {stored:.2}, recomputed {recomputed:.2}"
    )]
    Reconciliation {
        /// The drifted account's code
        account: String,
        /// The incrementally-maintained balance
        stored: f64,
        /// The balance recomputed from the entry log
        recomputed: f64,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (configuration file reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience `Result` type
/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
