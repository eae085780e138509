//! Recovery sweepers
//!
//! A coordinator that dies mid-transfer leaves its log record in a
//! non-terminal state. Once the record's `last_modified` ages past the
//! recovery threshold it counts as stuck, and one of three sweeps resolves
//! it:
//!
//! - [`Bank::recover_pending_transactions`] rolls stuck `pending` records
//!   forward to `done`, replaying the full tail of the transfer
//! - [`Bank::recover_applied_transactions`] rolls stuck `applied` records
//!   forward, replaying only the pending-set cleanup
//! - [`Bank::cancel_pending_transactions`] rolls stuck `pending` records
//!   back to `canceled`, compensating whichever account applies already
//!   happened on
//!
//! Every step reuses the guarded primitives of the transfer protocol, so
//! running a sweep twice - or concurrently with another sweeper or with a
//! still-alive coordinator - never double-moves money. A given stuck
//! record should be handed to either a roll-forward or the roll-back
//! sweep; the caller picks the policy per invocation.

use crate::core::bank::Bank;
use crate::types::{BankError, TxnState};
use std::time::SystemTime;
use tracing::info;

impl Bank {
    /// Roll stuck `pending` transactions forward to completion
    ///
    /// For each transaction in `pending` older than the recovery age:
    /// re-apply to both accounts, transition to `applied`, pull the
    /// pending-set entries, and transition to `done`. Steps already
    /// performed by the dead coordinator no-op.
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] on a store failure; transactions recovered
    /// before the failure stay recovered.
    pub fn recover_pending_transactions(&self) -> Result<(), BankError> {
        for txn in self.transactions.stuck(TxnState::Pending, self.stuck_threshold()) {
            info!("About to recover pending transaction {}", txn.id);
            self.accounts.apply_pending(txn.id, txn.source, -txn.value);
            self.accounts.apply_pending(txn.id, txn.destination, txn.value);
            self.transactions
                .transition(txn.id, TxnState::Pending, TxnState::Applied);
            self.accounts.remove_applied(txn.id, txn.source);
            self.accounts.remove_applied(txn.id, txn.destination);
            self.transactions
                .transition(txn.id, TxnState::Applied, TxnState::Done);
            info!("Recovered pending transaction {}", txn.id);
        }
        Ok(())
    }

    /// Roll stuck `applied` transactions forward to completion
    ///
    /// The balances already reflect the transfer; only the pending-set
    /// cleanup and the final transition remain.
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] on a store failure; transactions recovered
    /// before the failure stay recovered.
    pub fn recover_applied_transactions(&self) -> Result<(), BankError> {
        info!("Start recovering applied transactions");
        for txn in self.transactions.stuck(TxnState::Applied, self.stuck_threshold()) {
            info!("About to recover applied transaction {}", txn.id);
            self.accounts.remove_applied(txn.id, txn.source);
            self.accounts.remove_applied(txn.id, txn.destination);
            self.transactions
                .transition(txn.id, TxnState::Applied, TxnState::Done);
            info!("Recovered applied transaction {}", txn.id);
        }
        info!("Finished recovering applied transactions");
        Ok(())
    }

    /// Roll stuck `pending` transactions back, undoing any partial applies
    ///
    /// First bulk-flips every stuck `pending` record to `canceling`, then
    /// for each canceling record compensates the destination and the
    /// source - each guarded on the pending-set entry, so only applies
    /// that actually happened are undone - and transitions the record to
    /// `canceled`.
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] on a store failure; transactions canceled
    /// before the failure stay canceled.
    pub fn cancel_pending_transactions(&self) -> Result<(), BankError> {
        info!("Start cancelling pending transactions");
        self.transactions.mark_canceling(self.stuck_threshold());
        for txn in self.transactions.in_state(TxnState::Canceling) {
            if self.accounts.compensate(txn.id, txn.destination, -txn.value) == 1 {
                info!(
                    "Updated destination account {} by depositing -${} and removing txn {}",
                    txn.destination, txn.value, txn.id
                );
            }
            if self.accounts.compensate(txn.id, txn.source, txn.value) == 1 {
                info!(
                    "Updated source account {} by depositing ${} and removing txn {}",
                    txn.source, txn.value, txn.id
                );
            }
            if self
                .transactions
                .transition(txn.id, TxnState::Canceling, TxnState::Canceled)
                == 1
            {
                info!("Updated transaction {} to state 'canceled'", txn.id);
            }
        }
        info!("Finish cancelling pending transactions");
        Ok(())
    }

    fn stuck_threshold(&self) -> SystemTime {
        SystemTime::now() - self.recovery_age()
    }
}
