//! Types module
//!
//! Contains the data structures shared across the crate:
//! - `account`: the account document and its filter/update descriptors
//! - `transaction`: the transaction-log document, states, and descriptors
//! - `error`: the closed error taxonomy

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountFilter, AccountId, AccountUpdate, PendingTxn};
pub use error::BankError;
pub use transaction::{Transaction, TxnFilter, TxnId, TxnState, TxnUpdate};
