//! Account service
//!
//! Every operation here is a single-document read or conditional update
//! against the `accounts` collection. The service also hosts the three
//! guarded primitives the transfer protocol is built from: applying a
//! pending transaction, removing an applied one, and compensating a
//! canceled one. Each primitive's filter doubles as its idempotence guard,
//! so replaying any of them after a crash is a no-op.

use crate::core::sequence::IdSequence;
use crate::store::Collection;
use crate::types::{Account, AccountFilter, AccountId, AccountUpdate, BankError, TxnId};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// The account service over the `accounts` collection
pub struct Accounts {
    store: Collection<Account>,
    ids: IdSequence,
}

impl Accounts {
    /// Create an account service over an empty collection
    pub fn new() -> Self {
        Accounts {
            store: Collection::new(),
            ids: IdSequence::new(),
        }
    }

    /// Create a new account and return its number
    ///
    /// Account numbers start at 1 and are monotonic within the process.
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] if the insert fails.
    pub fn create(&self) -> Result<AccountId, BankError> {
        let reserved = self.ids.reserve(&self.store);
        let id = reserved.get();
        self.store.insert(Account::new(id)).map_err(|err| {
            error!("Failed to create new account: {err}");
            BankError::DbError
        })?;
        info!("Created account {id}");
        Ok(id)
    }

    /// Read one account
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if no account has that number.
    pub fn get(&self, id: AccountId) -> Result<Account, BankError> {
        match self.store.find_one(&AccountFilter::new().id(id)) {
            Some(account) => Ok(account),
            None => {
                error!("Account {id} does not exist");
                Err(BankError::NonExistingAccount)
            }
        }
    }

    /// Close an account
    ///
    /// Closing an already-closed account is a logged warning, not an error.
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if no account has that number.
    pub fn close(&self, id: AccountId) -> Result<(), BankError> {
        let account = self.get(id)?;
        if account.closed {
            warn!("Account {id} was already closed");
            return Ok(());
        }
        let matched = self.store.update_one(
            &AccountFilter::new().id(id),
            &AccountUpdate::new().set_closed(true),
        );
        if matched == 1 {
            info!("Closed account {id}");
        } else {
            error!("Failed to close account {id}");
        }
        Ok(())
    }

    /// Current balance of an account
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if no account has that number.
    pub fn balance(&self, id: AccountId) -> Result<Decimal, BankError> {
        Ok(self.get(id)?.balance)
    }

    /// Whether an account is closed
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if no account has that number.
    pub fn is_closed(&self, id: AccountId) -> Result<bool, BankError> {
        Ok(self.get(id)?.closed)
    }

    /// Deposit `amount` into an account and return the new balance
    ///
    /// The deposit is an unconditional balance increment; in particular it
    /// does not check the closed flag, matching the account contract.
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if no account has that number.
    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Decimal, BankError> {
        self.store.update_one(
            &AccountFilter::new().id(id),
            &AccountUpdate::new().inc_balance(amount),
        );
        info!("Deposited ${amount} into account {id}");
        self.balance(id)
    }

    /// Withdraw `amount` from an account and return the new balance
    ///
    /// The balance check and the decrement are two separate store calls;
    /// concurrent withdrawals on the same account can oversubscribe it.
    ///
    /// # Errors
    ///
    /// - [`BankError::NonExistingAccount`] if no account has that number
    /// - [`BankError::ClosedAccount`] if the account is closed
    /// - [`BankError::InsufficientBalance`] if `amount` exceeds the balance
    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<Decimal, BankError> {
        let account = self.get(id)?;
        if account.closed {
            error!("Cannot withdraw ${amount} from account {id} because it is closed");
            return Err(BankError::ClosedAccount);
        }
        if amount > account.balance {
            error!(
                "Can't withdraw ${amount} from account {id} because of insufficient balance ${}",
                account.balance
            );
            return Err(BankError::InsufficientBalance);
        }
        self.store.update_one(
            &AccountFilter::new().id(id),
            &AccountUpdate::new().inc_balance(-amount),
        );
        info!("${amount} was withdrawn from account {id}");
        self.balance(id)
    }

    /// Apply a pending transaction to an account: `balance += delta` and
    /// push `txn` onto the pending set
    ///
    /// Guarded by `closed = false` and `txn` not already pending, so the
    /// money moves at most once no matter how often the step is replayed,
    /// and a closed account never picks up new pending transactions.
    pub(crate) fn apply_pending(&self, txn: TxnId, id: AccountId, delta: Decimal) {
        let matched = self.store.update_one(
            &AccountFilter::new().id(id).open().without_pending(txn),
            &AccountUpdate::new().inc_balance(delta).push_pending(txn),
        );
        match matched {
            1 => info!("Applied transaction {txn} for amount ${delta} to account {id}"),
            _ => info!("Did not apply transaction {txn} for amount ${delta} to account {id}"),
        }
    }

    /// Remove an applied transaction from an account's pending set
    ///
    /// Guarded by `txn` being pending, the inverse of [`Self::apply_pending`]'s
    /// guard; replaying removes at most once.
    pub(crate) fn remove_applied(&self, txn: TxnId, id: AccountId) {
        let matched = self.store.update_one(
            &AccountFilter::new().id(id).with_pending(txn),
            &AccountUpdate::new().pull_pending(txn),
        );
        match matched {
            1 => info!("Removed applied transaction {txn} from account {id}"),
            _ => info!(
                "Did not remove applied transaction {txn} from account {id} because it did not contain it"
            ),
        }
    }

    /// Undo a canceled transaction on an account: `balance += delta` and
    /// pull `txn` from the pending set, in one atomic update
    ///
    /// Guarded by `txn` being pending, so the compensation only fires if
    /// the apply actually happened on this account. Returns the matched
    /// count.
    pub(crate) fn compensate(&self, txn: TxnId, id: AccountId, delta: Decimal) -> u64 {
        self.store.update_one(
            &AccountFilter::new().id(id).with_pending(txn),
            &AccountUpdate::new().inc_balance(delta).pull_pending(txn),
        )
    }

    /// Delete every account document
    pub(crate) fn clear(&self) {
        self.store.delete_many(&AccountFilter::new());
    }
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new()
    }
}
