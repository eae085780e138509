//! Two-Phase Bank demo CLI
//!
//! Runs a small transfer scenario against an in-process bank: two accounts,
//! a deposit, and a transfer that can be crashed mid-protocol with an
//! injected failure. After the crashed transfer ages past the recovery
//! threshold, the selected sweeper resolves it, and the final balances and
//! transaction state are printed.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --fail-at pending --sweeper recover-pending
//! cargo run -- --fail-at pending --sweeper cancel-pending
//! cargo run -- --fail-at applied --sweeper recover-applied --amount 50
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unknown account, insufficient balance, store failure)

use rust_decimal::Decimal;
use std::process;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use two_phase_bank::cli::{self, CliArgs, SweeperKind};
use two_phase_bank::{Bank, BankConfig, BankError};

fn main() {
    init_logging();
    let args = cli::parse_args();

    if let Err(error) = run(&args) {
        eprintln!("Error {}: {}", error.code(), error);
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(args: &CliArgs) -> Result<(), BankError> {
    let bank = Bank::with_config(BankConfig::new(Duration::from_millis(args.recovery_age_ms)));

    let source = bank.create_account()?;
    let destination = bank.create_account()?;
    bank.deposit(source, args.deposit)?;

    let outcome = bank.transfer_with_failpoint(
        source,
        destination,
        args.amount,
        args.fail_at.map(Into::into),
    );

    match outcome {
        Ok(()) => info!("Transfer completed cleanly, nothing to recover"),
        Err(error) => {
            warn!("Transfer aborted mid-protocol ({error}); waiting for it to become stuck");
            thread::sleep(bank.recovery_age() + Duration::from_millis(50));
            match args.sweeper {
                SweeperKind::RecoverPending => bank.recover_pending_transactions()?,
                SweeperKind::RecoverApplied => bank.recover_applied_transactions()?,
                SweeperKind::CancelPending => bank.cancel_pending_transactions()?,
            }
        }
    }

    print_outcome(&bank, source, destination)?;
    Ok(())
}

fn print_outcome(bank: &Bank, source: u32, destination: u32) -> Result<(), BankError> {
    println!("source balance:      {}", display_amount(bank.balance(source)?));
    println!(
        "destination balance: {}",
        display_amount(bank.balance(destination)?)
    );
    if let Some(txn) = bank.transaction(1) {
        println!("transaction state:   {}", txn.state);
    }
    Ok(())
}

// Currency values are kept as exact decimals internally; rescaling to two
// places happens only here at the display boundary.
fn display_amount(amount: Decimal) -> String {
    format!("${:.2}", amount)
}
