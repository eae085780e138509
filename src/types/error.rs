//! Error types for the banking core
//!
//! The taxonomy is deliberately closed: every failure a caller can observe
//! is one of the five variants below, each carrying a stable numeric code.
//!
//! # Error policy
//!
//! - **Domain errors** (closed account, insufficient balance, missing
//!   account or transaction) are surfaced immediately and never retried.
//! - **Store errors** surface as [`BankError::DbError`]. A transfer
//!   interrupted by one leaves its on-disk state as-is; the recovery
//!   sweepers finish the job once the transaction ages past the threshold.

use crate::store::StoreError;
use thiserror::Error;

/// Every failure the banking core can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BankError {
    /// A store operation failed, or a fault was injected mid-transfer
    ///
    /// The interrupted operation's durable state is left in place for the
    /// recovery sweepers to resolve.
    #[error("A database error occurred")]
    DbError,

    /// A withdrawal or transfer asked for more than the account holds
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// The referenced account number does not exist
    #[error("Account does not exist")]
    NonExistingAccount,

    /// The referenced transaction does not exist
    #[error("Transaction does not exist")]
    NonExistingTransaction,

    /// The operation is not allowed on a closed account
    #[error("Closed account")]
    ClosedAccount,
}

impl BankError {
    /// Stable numeric code of this error kind
    pub fn code(self) -> u8 {
        match self {
            BankError::DbError => 0,
            BankError::InsufficientBalance => 1,
            BankError::NonExistingAccount => 2,
            BankError::NonExistingTransaction => 3,
            BankError::ClosedAccount => 4,
        }
    }
}

// Any adapter-level failure is a database error to callers.
impl From<StoreError> for BankError {
    fn from(_: StoreError) -> Self {
        BankError::DbError
    }
}
