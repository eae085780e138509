//! The bank engine
//!
//! `Bank` coordinates the account service and the transaction log. It owns
//! the single runtime knob (the recovery age threshold) and exposes the
//! public operation surface; the transfer state machine and the recovery
//! sweepers live in their own modules as further `impl Bank` blocks.
//!
//! A `Bank` is an explicit value: construct one and share it (`&Bank` is
//! enough, all operations take `&self`). All in-memory synchronization it
//! needs is the ID-allocation mutex inside each component and the store's
//! per-document locking.

use crate::core::accounts::Accounts;
use crate::core::transactions::TransactionLog;
use crate::types::{AccountId, BankError, Transaction, TxnId};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Default age after which an unfinished transaction counts as stuck
pub const DEFAULT_RECOVERY_AGE: Duration = Duration::from_millis(5000);

/// Construction-time configuration for a [`Bank`]
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Age after which an unfinished transaction is eligible for recovery
    pub recovery_age: Duration,
}

impl BankConfig {
    /// A config with the given recovery age
    pub fn new(recovery_age: Duration) -> Self {
        if recovery_age.is_zero() {
            warn!("Recovery age of zero makes every in-flight transaction immediately stuck");
        }
        BankConfig { recovery_age }
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            recovery_age: DEFAULT_RECOVERY_AGE,
        }
    }
}

/// A bank over two collections: `accounts` and `transactions`
pub struct Bank {
    pub(crate) accounts: Accounts,
    pub(crate) transactions: TransactionLog,
    recovery_age_ms: AtomicU64,
}

impl Bank {
    /// Open a bank with the default configuration
    pub fn new() -> Self {
        Self::with_config(BankConfig::default())
    }

    /// Open a bank with an explicit configuration
    pub fn with_config(config: BankConfig) -> Self {
        let bank = Bank {
            accounts: Accounts::new(),
            transactions: TransactionLog::new(),
            recovery_age_ms: AtomicU64::new(duration_to_ms(config.recovery_age)),
        };
        info!("Bank open for business");
        bank
    }

    /// Create a new account and return its number
    ///
    /// # Errors
    ///
    /// [`BankError::DbError`] if the insert fails.
    pub fn create_account(&self) -> Result<AccountId, BankError> {
        self.accounts.create()
    }

    /// Close an account; closing twice is a logged warning, not an error
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if the account does not exist.
    pub fn close_account(&self, id: AccountId) -> Result<(), BankError> {
        self.accounts.close(id)
    }

    /// Current balance of an account
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if the account does not exist.
    pub fn balance(&self, id: AccountId) -> Result<Decimal, BankError> {
        self.accounts.balance(id)
    }

    /// Whether an account is closed
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if the account does not exist.
    pub fn is_closed(&self, id: AccountId) -> Result<bool, BankError> {
        self.accounts.is_closed(id)
    }

    /// Deposit `amount` into an account and return the new balance
    ///
    /// # Errors
    ///
    /// [`BankError::NonExistingAccount`] if the account does not exist.
    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Decimal, BankError> {
        self.accounts.deposit(id, amount)
    }

    /// Withdraw `amount` from an account and return the new balance
    ///
    /// # Errors
    ///
    /// - [`BankError::NonExistingAccount`] if the account does not exist
    /// - [`BankError::ClosedAccount`] if the account is closed
    /// - [`BankError::InsufficientBalance`] if `amount` exceeds the balance
    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<Decimal, BankError> {
        self.accounts.withdraw(id, amount)
    }

    /// Read one transaction-log record
    pub fn transaction(&self, id: TxnId) -> Option<Transaction> {
        self.transactions.find(id)
    }

    /// Wipe both collections, restoring the bank to its initial state
    pub fn reset(&self) {
        self.accounts.clear();
        self.transactions.clear();
    }

    /// Age after which an unfinished transaction is eligible for recovery
    pub fn recovery_age(&self) -> Duration {
        Duration::from_millis(self.recovery_age_ms.load(Ordering::Relaxed))
    }

    /// Change the recovery age threshold
    pub fn set_recovery_age(&self, age: Duration) {
        self.recovery_age_ms
            .store(duration_to_ms(age), Ordering::Relaxed);
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
