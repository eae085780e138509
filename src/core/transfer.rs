//! The transfer state machine
//!
//! A transfer moves money between two account documents the store cannot
//! update atomically together. The coordinator therefore walks a fixed
//! sequence of single-document steps, each either a conditional state
//! transition of the log record or a guarded mutation of one account:
//!
//! 1. read the source and check its balance covers the amount
//! 2. insert the log record in `initial`
//! 3. verify the record is discoverable by `(source, destination, initial)`
//! 4. transition `initial -> pending`
//! 5. apply to the source (`-amount`, push pending)
//! 6. apply to the destination (`+amount`, push pending)
//! 7. transition `pending -> applied`
//! 8. pull the record from the source's pending set
//! 9. pull the record from the destination's pending set
//! 10. transition `applied -> done`
//!
//! Every money-moving step is guarded on pending-set membership and every
//! transition on the expected current state, so replaying any prefix of
//! the sequence - by this coordinator or by a recovery sweeper - changes
//! nothing that already happened. A failure at any step simply stops the
//! walk; the record's age then makes it visible to the sweepers.

use crate::core::bank::Bank;
use crate::types::{AccountId, BankError, TxnState};
use rust_decimal::Decimal;
use tracing::{error, info};

/// Test hook: abort the transfer right after the named state is reached
///
/// Simulates the coordinator crashing mid-protocol; the injected failure
/// surfaces as [`BankError::DbError`], exactly like a real store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failpoint {
    /// Fail after the source account was debited in the `pending` state
    Pending,
    /// Fail after the source's pending-set entry was removed in the
    /// `applied` state
    Applied,
}

impl Bank {
    /// Transfer `amount` from `source` to `destination`
    ///
    /// # Errors
    ///
    /// - [`BankError::NonExistingAccount`] if the source does not exist
    /// - [`BankError::InsufficientBalance`] if the source balance is too low
    /// - [`BankError::DbError`] on a store failure; the transfer's durable
    ///   state is left as-is for the recovery sweepers
    pub fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
    ) -> Result<(), BankError> {
        self.transfer_with_failpoint(source, destination, amount, None)
    }

    /// [`Bank::transfer`] with an optional injected failure, for crash tests
    ///
    /// Production callers pass `None`; see [`Failpoint`] for the hook's
    /// semantics.
    pub fn transfer_with_failpoint(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        failpoint: Option<Failpoint>,
    ) -> Result<(), BankError> {
        // Precondition: the source balance covers the amount.
        let src = self.accounts.get(source)?;
        if amount > src.balance {
            error!(
                "Balance ${} in account {source} is insufficient to transfer ${amount} \
                 to account {destination}",
                src.balance
            );
            return Err(BankError::InsufficientBalance);
        }

        // Open the log record and verify it is discoverable by route.
        let txn = self.transactions.create(source, destination, amount)?;
        self.transactions
            .find_by_route(source, destination, TxnState::Initial)?;

        self.transactions
            .transition(txn.id, TxnState::Initial, TxnState::Pending);

        self.accounts.apply_pending(txn.id, source, -amount);

        if failpoint == Some(Failpoint::Pending) {
            error!(
                "The transfer transaction {} failed in the 'pending' state",
                txn.id
            );
            return Err(BankError::DbError);
        }

        self.accounts.apply_pending(txn.id, destination, amount);

        self.transactions
            .transition(txn.id, TxnState::Pending, TxnState::Applied);

        self.accounts.remove_applied(txn.id, source);

        if failpoint == Some(Failpoint::Applied) {
            error!(
                "The transfer transaction {} failed in the 'applied' state",
                txn.id
            );
            return Err(BankError::DbError);
        }

        self.accounts.remove_applied(txn.id, destination);

        self.transactions
            .transition(txn.id, TxnState::Applied, TxnState::Done);

        info!("Transferred ${amount} from account {source} to account {destination}");
        Ok(())
    }
}
