use crate::core::Failpoint;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;

/// Run a two-account transfer scenario, optionally crashing it mid-protocol
/// and resolving the wreckage with a recovery sweep
#[derive(Parser, Debug)]
#[command(name = "two-phase-bank")]
#[command(
    about = "Demonstrate crash-consistent money transfer over a document store",
    long_about = None
)]
pub struct CliArgs {
    /// Initial deposit into the source account
    #[arg(long, value_name = "AMOUNT", default_value = "100")]
    pub deposit: Decimal,

    /// Amount to transfer from the source to the destination account
    #[arg(long, value_name = "AMOUNT", default_value = "45.34")]
    pub amount: Decimal,

    /// Inject a synthetic store failure after the named transfer state
    #[arg(long = "fail-at", value_enum, value_name = "STATE")]
    pub fail_at: Option<FailAt>,

    /// Sweeper to run once the crashed transfer has aged past the threshold
    #[arg(long, value_enum, value_name = "SWEEPER", default_value = "recover-pending")]
    pub sweeper: SweeperKind,

    /// Age in milliseconds after which an unfinished transaction counts as stuck
    #[arg(long = "recovery-age-ms", value_name = "MS", default_value_t = 250)]
    pub recovery_age_ms: u64,
}

/// Transfer states a synthetic failure can be injected after
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FailAt {
    Pending,
    Applied,
}

impl From<FailAt> for Failpoint {
    fn from(fail_at: FailAt) -> Self {
        match fail_at {
            FailAt::Pending => Failpoint::Pending,
            FailAt::Applied => Failpoint::Applied,
        }
    }
}

/// Available recovery sweeps
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SweeperKind {
    /// Roll stuck pending transactions forward to completion
    RecoverPending,
    /// Roll stuck applied transactions forward to completion
    RecoverApplied,
    /// Roll stuck pending transactions back, restoring the source
    CancelPending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["two-phase-bank"]);

        assert_eq!(args.deposit, Decimal::new(100, 0));
        assert_eq!(args.amount, Decimal::new(4534, 2));
        assert!(args.fail_at.is_none());
        assert!(matches!(args.sweeper, SweeperKind::RecoverPending));
        assert_eq!(args.recovery_age_ms, 250);
    }

    #[rstest]
    #[case::pending("pending", Failpoint::Pending)]
    #[case::applied("applied", Failpoint::Applied)]
    fn test_fail_at_parsing(#[case] flag: &str, #[case] expected: Failpoint) {
        let args = CliArgs::parse_from(["two-phase-bank", "--fail-at", flag]);
        assert_eq!(args.fail_at.map(Failpoint::from), Some(expected));
    }

    #[rstest]
    #[case::recover_pending("recover-pending")]
    #[case::recover_applied("recover-applied")]
    #[case::cancel_pending("cancel-pending")]
    fn test_sweeper_parsing(#[case] flag: &str) {
        let args = CliArgs::parse_from(["two-phase-bank", "--sweeper", flag]);
        let _ = args.sweeper;
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert!(CliArgs::try_parse_from(["two-phase-bank", "--amount", "lots"]).is_err());
    }
}
