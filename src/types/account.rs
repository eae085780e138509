//! Account document and its query/mutation descriptors
//!
//! An account is one document in the `accounts` collection. Its balance is
//! only ever changed through increment updates, and during a transfer those
//! increments are guarded by a membership predicate over the account's
//! pending-transaction set - which is what makes replaying a transfer step
//! apply at most once.

use crate::store::Document;
use crate::types::transaction::TxnId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Account number
///
/// Positive, unique, and monotonic at creation time.
pub type AccountId = u32;

/// One account document
///
/// `pending_transactions` holds the ids of transactions that have moved
/// money on this account but are not yet finalized; membership in that set
/// is the idempotence key for replaying transfer steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The account number
    pub id: AccountId,

    /// Whether the account has been closed
    ///
    /// A closed account never again accepts a new pending transaction: the
    /// conditional update that applies one filters on `closed = false`.
    pub closed: bool,

    /// Current balance
    pub balance: Decimal,

    /// Ids of in-flight transactions touching this account (set semantics)
    pub pending_transactions: Vec<TxnId>,
}

impl Account {
    /// A fresh account: open, zero balance, no pending transactions
    pub fn new(id: AccountId) -> Self {
        Account {
            id,
            closed: false,
            balance: Decimal::ZERO,
            pending_transactions: Vec::new(),
        }
    }

    /// Whether `txn` is in this account's pending set
    pub fn has_pending(&self, txn: TxnId) -> bool {
        self.pending_transactions.contains(&txn)
    }
}

/// Membership predicate over an account's pending set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTxn {
    /// The pending set contains the transaction
    Contains(TxnId),
    /// The pending set does not contain the transaction
    Excludes(TxnId),
}

/// Query descriptor for account documents
///
/// Clauses are conjunctive; a default filter matches every account.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Equality on the account number
    pub id: Option<AccountId>,
    /// Equality on the closed flag
    pub closed: Option<bool>,
    /// Membership predicate over the pending set
    pub pending: Option<PendingTxn>,
}

impl AccountFilter {
    /// A filter with no clauses (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the account number to equal `id`
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    /// Require the account to be open (`closed = false`)
    pub fn open(mut self) -> Self {
        self.closed = Some(false);
        self
    }

    /// Require `txn` to be in the pending set
    pub fn with_pending(mut self, txn: TxnId) -> Self {
        self.pending = Some(PendingTxn::Contains(txn));
        self
    }

    /// Require `txn` to be absent from the pending set
    pub fn without_pending(mut self, txn: TxnId) -> Self {
        self.pending = Some(PendingTxn::Excludes(txn));
        self
    }
}

/// Mutation descriptor for account documents
///
/// Clauses compose; all of them are applied under the document lock.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    /// Add a (possibly negative) delta to the balance
    pub inc_balance: Option<Decimal>,
    /// Append a transaction id to the pending set
    pub push_pending: Option<TxnId>,
    /// Remove a transaction id from the pending set
    pub pull_pending: Option<TxnId>,
    /// Overwrite the closed flag
    pub set_closed: Option<bool>,
}

impl AccountUpdate {
    /// An update with no clauses
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the balance by `delta`
    pub fn inc_balance(mut self, delta: Decimal) -> Self {
        self.inc_balance = Some(delta);
        self
    }

    /// Append `txn` to the pending set
    ///
    /// Appends unconditionally; callers that need at-most-once semantics
    /// guard the update with [`AccountFilter::without_pending`].
    pub fn push_pending(mut self, txn: TxnId) -> Self {
        self.push_pending = Some(txn);
        self
    }

    /// Remove `txn` from the pending set
    pub fn pull_pending(mut self, txn: TxnId) -> Self {
        self.pull_pending = Some(txn);
        self
    }

    /// Overwrite the closed flag
    pub fn set_closed(mut self, closed: bool) -> Self {
        self.set_closed = Some(closed);
        self
    }
}

impl Document for Account {
    type Id = AccountId;
    type Filter = AccountFilter;
    type Update = AccountUpdate;

    fn id(&self) -> AccountId {
        self.id
    }

    fn matches(&self, filter: &AccountFilter) -> bool {
        if let Some(id) = filter.id {
            if self.id != id {
                return false;
            }
        }
        if let Some(closed) = filter.closed {
            if self.closed != closed {
                return false;
            }
        }
        match filter.pending {
            Some(PendingTxn::Contains(txn)) if !self.has_pending(txn) => return false,
            Some(PendingTxn::Excludes(txn)) if self.has_pending(txn) => return false,
            _ => {}
        }
        true
    }

    fn apply(&mut self, update: &AccountUpdate, _now: SystemTime) {
        if let Some(delta) = update.inc_balance {
            self.balance += delta;
        }
        if let Some(txn) = update.push_pending {
            self.pending_transactions.push(txn);
        }
        if let Some(txn) = update.pull_pending {
            self.pending_transactions.retain(|&pending| pending != txn);
        }
        if let Some(closed) = update.set_closed {
            self.closed = closed;
        }
    }
}
