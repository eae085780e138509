//! Two-Phase Bank Library
//! # Overview
//!
//! This library implements atomic money transfer between account documents
//! that live in a store offering only single-document atomic updates. A
//! durable transaction log drives a per-transfer state machine, and two
//! independent recovery paths (roll-forward and roll-back) resolve
//! transfers whose coordinator died mid-protocol.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, BankError) and
//!   their typed filter/update descriptors
//! - [`store`] - The document-store adapter: the [`store::Document`]
//!   capability and the [`store::Collection`] engine with single-document
//!   atomic conditional updates
//! - [`core`] - Banking logic:
//!   - [`core::accounts`] - account operations and the guarded 2PC primitives
//!   - [`core::transactions`] - the durable transaction log
//!   - [`core::transfer`] - the two-phase transfer coordinator
//!   - [`core::recovery`] - the recovery and cancellation sweepers
//! - [`tree`] - A materialized-path tree of pages sharing the store adapter
//! - [`cli`] - CLI argument parsing for the demo binary
//!
//! # Transfer lifecycle
//!
//! A transfer's log record advances along exactly one of two paths:
//!
//! - roll-forward: `initial -> pending -> applied -> done`
//! - roll-back: `pending -> canceling -> canceled`
//!
//! Money-moving steps are guarded by membership predicates over each
//! account's pending-transaction set, and state transitions are keyed on
//! the expected current state, so any step can be replayed - after a
//! crash, or by concurrent sweepers - without applying twice.

// Module declarations
pub mod cli;
pub mod core;
pub mod store;
pub mod tree;
pub mod types;

pub use crate::core::{Accounts, Bank, BankConfig, Failpoint, TransactionLog};
pub use crate::store::{Collection, Document, StoreError};
pub use crate::tree::{Page, Pages};
pub use crate::types::{Account, AccountId, BankError, Transaction, TxnId, TxnState};
