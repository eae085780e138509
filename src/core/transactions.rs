//! The durable transaction log
//!
//! One document per transfer, carrying the state machine that makes the
//! transfer atomic across account documents. Every state transition is a
//! conditional update keyed on `(id, expected current state)`: it matches
//! exactly once no matter how many writers and recoverers race over it.

use crate::core::sequence::IdSequence;
use crate::store::Collection;
use crate::types::{AccountId, BankError, Transaction, TxnFilter, TxnId, TxnState, TxnUpdate};
use rust_decimal::Decimal;
use std::time::SystemTime;
use tracing::{error, info};

/// The transaction-log service over the `transactions` collection
pub struct TransactionLog {
    store: Collection<Transaction>,
    ids: IdSequence,
}

impl TransactionLog {
    /// Create a transaction log over an empty collection
    pub fn new() -> Self {
        TransactionLog {
            store: Collection::new(),
            ids: IdSequence::new(),
        }
    }

    /// Read one transaction by number
    pub fn find(&self, id: TxnId) -> Option<Transaction> {
        self.store.find_one(&TxnFilter::new().id(id))
    }

    /// Open a new transaction in the `initial` state
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] if the insert fails.
    pub(crate) fn create(
        &self,
        source: AccountId,
        destination: AccountId,
        value: Decimal,
    ) -> Result<Transaction, BankError> {
        let reserved = self.ids.reserve(&self.store);
        let txn = Transaction::open(reserved.get(), source, destination, value);
        self.store.insert(txn.clone()).map_err(|err| {
            error!(
                "Failed to create a transaction to transfer ${value} from account {source} \
                 to account {destination}: {err}"
            );
            BankError::DbError
        })?;
        info!(
            "Created transaction {} to transfer ${value} from account {source} to account {destination}",
            txn.id
        );
        Ok(txn)
    }

    /// Find a transaction by `(source, destination, state)`
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingTransaction`] if nothing matches.
    pub(crate) fn find_by_route(
        &self,
        source: AccountId,
        destination: AccountId,
        state: TxnState,
    ) -> Result<Transaction, BankError> {
        let filter = TxnFilter::new()
            .source(source)
            .destination(destination)
            .state(state);
        match self.store.find_one(&filter) {
            Some(txn) => {
                info!(
                    "Found transaction {} with state '{state}' for source account {source} \
                     and destination account {destination}",
                    txn.id
                );
                Ok(txn)
            }
            None => {
                error!(
                    "No transaction exists with state '{state}' for source account {source} \
                     and destination account {destination}"
                );
                Err(BankError::NonExistingTransaction)
            }
        }
    }

    /// Conditionally transition one transaction from `from` to `to`
    ///
    /// Keyed on the current state, so the transition fires at most once;
    /// `last_modified` is refreshed in the same atomic update. Returns the
    /// matched count.
    pub(crate) fn transition(&self, id: TxnId, from: TxnState, to: TxnState) -> u64 {
        let matched = self.store.update_one(
            &TxnFilter::new().id(id).state(from),
            &TxnUpdate::transition_to(to),
        );
        if matched == 1 {
            info!("Changed the state of transaction {id} from '{from}' to '{to}'");
        }
        matched
    }

    /// All transactions in `state` last modified strictly before `threshold`
    pub(crate) fn stuck(&self, state: TxnState, threshold: SystemTime) -> Vec<Transaction> {
        self.store
            .find(&TxnFilter::new().state(state).modified_before(threshold))
    }

    /// Bulk-flip every stuck `pending` transaction to `canceling`
    ///
    /// Returns how many transactions were flipped.
    pub(crate) fn mark_canceling(&self, threshold: SystemTime) -> u64 {
        self.store.update_many(
            &TxnFilter::new()
                .state(TxnState::Pending)
                .modified_before(threshold),
            &TxnUpdate::transition_to(TxnState::Canceling),
        )
    }

    /// All transactions currently in `state`
    pub(crate) fn in_state(&self, state: TxnState) -> Vec<Transaction> {
        self.store.find(&TxnFilter::new().state(state))
    }

    /// Delete every transaction document
    pub(crate) fn clear(&self) {
        self.store.delete_many(&TxnFilter::new());
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}
