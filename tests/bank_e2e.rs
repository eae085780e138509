//! End-to-end banking scenarios
//!
//! Each test drives a fresh `Bank` through its public surface only:
//! account lifecycle, deposits and withdrawals, clean transfers, crashed
//! transfers resolved by each recovery path, and the conservation and
//! idempotence properties the protocol promises.
//!
//! Crash tests inject a failure mid-transfer, wait for the transaction to
//! age past a short recovery threshold, and then run a sweeper - the same
//! sequence an operator would follow after a real coordinator death.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::thread;
    use std::time::Duration;
    use two_phase_bank::{Bank, BankError, Failpoint, TxnState};

    /// Short threshold so crash tests settle quickly.
    const RECOVERY_AGE: Duration = Duration::from_millis(250);

    fn wait_until_stuck(bank: &Bank) {
        thread::sleep(bank.recovery_age() + Duration::from_millis(50));
    }

    #[test]
    fn account_numbers_are_sequential_from_one() {
        let bank = Bank::new();

        assert_eq!(bank.create_account().unwrap(), 1);
        assert_eq!(bank.create_account().unwrap(), 2);
    }

    #[test]
    fn account_numbering_restarts_after_reset() {
        let bank = Bank::new();
        bank.create_account().unwrap();
        bank.create_account().unwrap();

        bank.reset();

        assert_eq!(bank.create_account().unwrap(), 1);
    }

    #[test]
    fn closing_accounts() {
        let bank = Bank::new();

        // A number that was never allocated cannot be closed.
        assert_eq!(bank.close_account(13), Err(BankError::NonExistingAccount));

        let account = bank.create_account().unwrap();
        assert!(!bank.is_closed(account).unwrap());
        bank.close_account(account).unwrap();
        assert!(bank.is_closed(account).unwrap());
    }

    #[test]
    fn deposit_is_reflected_in_the_returned_balance() {
        let bank = Bank::new();
        let account = bank.create_account().unwrap();

        assert_eq!(bank.balance(account).unwrap(), Decimal::ZERO);
        assert_eq!(
            bank.deposit(account, Decimal::new(5023, 2)).unwrap(),
            Decimal::new(5023, 2)
        );
    }

    #[test]
    fn withdrawal_is_reflected_in_the_returned_balance() {
        let bank = Bank::new();
        let account = bank.create_account().unwrap();
        bank.deposit(account, Decimal::new(12350, 2)).unwrap();

        let balance = bank.withdraw(account, Decimal::new(2350, 2)).unwrap();

        assert_eq!(balance, Decimal::new(10000, 2));
    }

    #[test]
    fn transfer_is_reflected_in_both_balances() {
        let bank = Bank::new();
        let source = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();
        let destination = bank.create_account().unwrap();

        bank.transfer(source, destination, Decimal::new(4534, 2))
            .unwrap();

        assert_eq!(bank.balance(source).unwrap(), Decimal::new(5466, 2));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::new(4534, 2));
        assert_eq!(bank.transaction(1).unwrap().state, TxnState::Done);
    }

    /// Both roll-forward paths finish a crashed transfer: balances land on
    /// the transferred split and the transaction reaches `done`.
    #[rstest]
    #[case::crashed_in_pending(Failpoint::Pending)]
    #[case::crashed_in_applied(Failpoint::Applied)]
    fn crashed_transfer_rolls_forward(#[case] failpoint: Failpoint) {
        let bank = Bank::new();
        bank.set_recovery_age(RECOVERY_AGE);
        let source = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();
        let destination = bank.create_account().unwrap();

        bank.transfer_with_failpoint(source, destination, Decimal::new(50, 0), Some(failpoint))
            .unwrap_err();
        wait_until_stuck(&bank);
        match failpoint {
            Failpoint::Pending => bank.recover_pending_transactions().unwrap(),
            Failpoint::Applied => bank.recover_applied_transactions().unwrap(),
        }

        assert_eq!(bank.balance(source).unwrap(), Decimal::new(50, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::new(50, 0));
        assert_eq!(bank.transaction(1).unwrap().state, TxnState::Done);
    }

    /// A transfer recovered past `applied` must not be rolled back; the
    /// way to undo it is a fresh transfer in the reverse direction.
    #[test]
    fn recovered_transfer_is_undone_by_the_reverse_transfer() {
        let bank = Bank::new();
        bank.set_recovery_age(RECOVERY_AGE);
        let source = bank.create_account().unwrap();
        let destination = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();

        bank.transfer_with_failpoint(
            source,
            destination,
            Decimal::new(50, 0),
            Some(Failpoint::Applied),
        )
        .unwrap_err();
        wait_until_stuck(&bank);
        bank.recover_applied_transactions().unwrap();

        bank.transfer(destination, source, Decimal::new(50, 0))
            .unwrap();

        assert_eq!(bank.balance(source).unwrap(), Decimal::new(100, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn crashed_transfer_rolls_back_via_cancellation() {
        let bank = Bank::new();
        bank.set_recovery_age(RECOVERY_AGE);
        let source = bank.create_account().unwrap();
        let destination = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();

        bank.transfer_with_failpoint(
            source,
            destination,
            Decimal::new(50, 0),
            Some(Failpoint::Pending),
        )
        .unwrap_err();
        wait_until_stuck(&bank);
        bank.cancel_pending_transactions().unwrap();

        assert_eq!(bank.balance(source).unwrap(), Decimal::new(100, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::ZERO);
        assert_eq!(bank.transaction(1).unwrap().state, TxnState::Canceled);
    }

    /// Running a sweeper a second time must change nothing: no double
    /// credit, no double debit.
    #[test]
    fn recovery_is_idempotent_end_to_end() {
        let bank = Bank::new();
        bank.set_recovery_age(RECOVERY_AGE);
        let source = bank.create_account().unwrap();
        let destination = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();

        bank.transfer_with_failpoint(
            source,
            destination,
            Decimal::new(50, 0),
            Some(Failpoint::Pending),
        )
        .unwrap_err();
        wait_until_stuck(&bank);

        bank.recover_pending_transactions().unwrap();
        bank.recover_pending_transactions().unwrap();

        assert_eq!(bank.balance(source).unwrap(), Decimal::new(50, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::new(50, 0));
    }

    /// Once terminal, a transaction is never revisited by any sweeper.
    #[test]
    fn terminal_states_are_never_revisited() {
        let bank = Bank::new();
        bank.set_recovery_age(RECOVERY_AGE);
        let source = bank.create_account().unwrap();
        let destination = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(100, 0)).unwrap();
        bank.transfer(source, destination, Decimal::new(25, 0))
            .unwrap();
        wait_until_stuck(&bank);

        bank.recover_pending_transactions().unwrap();
        bank.recover_applied_transactions().unwrap();
        bank.cancel_pending_transactions().unwrap();

        assert_eq!(bank.transaction(1).unwrap().state, TxnState::Done);
        assert_eq!(bank.balance(source).unwrap(), Decimal::new(75, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::new(25, 0));
    }

    /// Transfers only move money around; the total across all accounts
    /// stays equal to what was deposited, whatever the interleaving.
    #[test]
    fn transfers_conserve_the_total_balance() {
        let bank = Bank::new();
        let a = bank.create_account().unwrap();
        let b = bank.create_account().unwrap();
        let c = bank.create_account().unwrap();
        bank.deposit(a, Decimal::new(30000, 2)).unwrap();
        bank.deposit(b, Decimal::new(7000, 2)).unwrap();

        bank.transfer(a, b, Decimal::new(12575, 2)).unwrap();
        bank.transfer(b, c, Decimal::new(9950, 2)).unwrap();
        bank.transfer(a, c, Decimal::new(25, 2)).unwrap();
        bank.transfer(c, a, Decimal::new(5000, 2)).unwrap();

        let total = bank.balance(a).unwrap() + bank.balance(b).unwrap() + bank.balance(c).unwrap();
        assert_eq!(total, Decimal::new(37000, 2));
    }

    /// For any completed transfer, the reverse transfer restores both
    /// balances.
    #[test]
    fn reverse_transfer_restores_both_balances() {
        let bank = Bank::new();
        let a = bank.create_account().unwrap();
        let b = bank.create_account().unwrap();
        bank.deposit(a, Decimal::new(8125, 2)).unwrap();
        bank.deposit(b, Decimal::new(1000, 2)).unwrap();

        bank.transfer(a, b, Decimal::new(3333, 2)).unwrap();
        bank.transfer(b, a, Decimal::new(3333, 2)).unwrap();

        assert_eq!(bank.balance(a).unwrap(), Decimal::new(8125, 2));
        assert_eq!(bank.balance(b).unwrap(), Decimal::new(1000, 2));
    }

    #[test]
    fn transfer_with_insufficient_balance_is_rejected_up_front() {
        let bank = Bank::new();
        let source = bank.create_account().unwrap();
        let destination = bank.create_account().unwrap();
        bank.deposit(source, Decimal::new(10, 0)).unwrap();

        assert_eq!(
            bank.transfer(source, destination, Decimal::new(11, 0)),
            Err(BankError::InsufficientBalance)
        );
        assert_eq!(bank.balance(source).unwrap(), Decimal::new(10, 0));
        assert_eq!(bank.balance(destination).unwrap(), Decimal::ZERO);
    }
}
