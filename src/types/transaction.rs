//! Transaction document, state machine states, and descriptors
//!
//! A transaction is one document in the `transactions` collection: the
//! durable log record that turns a sequence of per-account writes into an
//! atomic transfer. Its `state` field advances monotonically along one of
//! two paths, and every transition is a conditional update keyed on the
//! expected current state, so racing actors cannot double-fire a step.

use crate::store::Document;
use crate::types::account::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Transaction number
///
/// Positive, unique, and monotonic at creation time.
pub type TxnId = u32;

/// States of the transfer state machine
///
/// Legal paths:
///
/// - roll-forward: `initial -> pending -> applied -> done`
/// - roll-back (from `pending` only): `pending -> canceling -> canceled`
///
/// `done` and `canceled` are terminal; no transition is ever reversed.
/// The lowercase names are the literal strings stored in the `state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnState {
    /// Log record written, no money moved yet
    Initial,
    /// Money movement in progress on the accounts
    Pending,
    /// Both balances updated, pending-set cleanup in progress
    Applied,
    /// Transfer fully finalized (terminal)
    Done,
    /// Roll-back in progress, compensating the accounts
    Canceling,
    /// Transfer fully undone (terminal)
    Canceled,
}

impl TxnState {
    /// The literal string stored in the `state` field
    pub fn as_str(self) -> &'static str {
        match self {
            TxnState::Initial => "initial",
            TxnState::Pending => "pending",
            TxnState::Applied => "applied",
            TxnState::Done => "done",
            TxnState::Canceling => "canceling",
            TxnState::Canceled => "canceled",
        }
    }

    /// Whether this state can never transition again
    pub fn is_terminal(self) -> bool {
        matches!(self, TxnState::Done | TxnState::Canceled)
    }
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transaction-log document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction number
    pub id: TxnId,

    /// Account the money leaves
    pub source: AccountId,

    /// Account the money arrives at
    pub destination: AccountId,

    /// Amount transferred (positive)
    pub value: Decimal,

    /// Current state-machine state
    pub state: TxnState,

    /// Store-clock timestamp of the last state transition
    ///
    /// The recovery sweepers treat a non-terminal transaction whose
    /// `last_modified` is older than the configured age threshold as stuck.
    pub last_modified: SystemTime,
}

impl Transaction {
    /// A freshly opened transaction in the `initial` state
    pub fn open(id: TxnId, source: AccountId, destination: AccountId, value: Decimal) -> Self {
        Transaction {
            id,
            source,
            destination,
            value,
            state: TxnState::Initial,
            last_modified: SystemTime::now(),
        }
    }
}

/// Query descriptor for transaction documents
///
/// Clauses are conjunctive; a default filter matches every transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxnFilter {
    /// Equality on the transaction number
    pub id: Option<TxnId>,
    /// Equality on the source account
    pub source: Option<AccountId>,
    /// Equality on the destination account
    pub destination: Option<AccountId>,
    /// Equality on the state
    pub state: Option<TxnState>,
    /// Strict upper bound on `last_modified`
    pub modified_before: Option<SystemTime>,
}

impl TxnFilter {
    /// A filter with no clauses (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the transaction number to equal `id`
    pub fn id(mut self, id: TxnId) -> Self {
        self.id = Some(id);
        self
    }

    /// Require the source account to equal `source`
    pub fn source(mut self, source: AccountId) -> Self {
        self.source = Some(source);
        self
    }

    /// Require the destination account to equal `destination`
    pub fn destination(mut self, destination: AccountId) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Require the state to equal `state`
    pub fn state(mut self, state: TxnState) -> Self {
        self.state = Some(state);
        self
    }

    /// Require `last_modified` to be strictly before `threshold`
    pub fn modified_before(mut self, threshold: SystemTime) -> Self {
        self.modified_before = Some(threshold);
        self
    }
}

/// Mutation descriptor for transaction documents
///
/// The only mutation the protocol ever needs: overwrite the state and
/// refresh `last_modified` from the store clock in the same atomic update.
#[derive(Debug, Clone, Copy)]
pub struct TxnUpdate {
    /// The state to transition into
    pub set_state: TxnState,
}

impl TxnUpdate {
    /// Transition into `state`, touching `last_modified`
    pub fn transition_to(state: TxnState) -> Self {
        TxnUpdate { set_state: state }
    }
}

impl Document for Transaction {
    type Id = TxnId;
    type Filter = TxnFilter;
    type Update = TxnUpdate;

    fn id(&self) -> TxnId {
        self.id
    }

    fn matches(&self, filter: &TxnFilter) -> bool {
        if let Some(id) = filter.id {
            if self.id != id {
                return false;
            }
        }
        if let Some(source) = filter.source {
            if self.source != source {
                return false;
            }
        }
        if let Some(destination) = filter.destination {
            if self.destination != destination {
                return false;
            }
        }
        if let Some(state) = filter.state {
            if self.state != state {
                return false;
            }
        }
        if let Some(threshold) = filter.modified_before {
            if self.last_modified >= threshold {
                return false;
            }
        }
        true
    }

    fn apply(&mut self, update: &TxnUpdate, now: SystemTime) {
        self.state = update.set_state;
        self.last_modified = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(TxnState::Initial, "initial")]
    #[case(TxnState::Pending, "pending")]
    #[case(TxnState::Applied, "applied")]
    #[case(TxnState::Done, "done")]
    #[case(TxnState::Canceling, "canceling")]
    #[case(TxnState::Canceled, "canceled")]
    fn test_state_wire_literals(#[case] state: TxnState, #[case] literal: &str) {
        assert_eq!(state.as_str(), literal);
        assert_eq!(state.to_string(), literal);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            format!("\"{literal}\"")
        );
    }

    #[rstest]
    #[case(TxnState::Initial, false)]
    #[case(TxnState::Pending, false)]
    #[case(TxnState::Applied, false)]
    #[case(TxnState::Done, true)]
    #[case(TxnState::Canceling, false)]
    #[case(TxnState::Canceled, true)]
    fn test_terminal_states(#[case] state: TxnState, #[case] terminal: bool) {
        assert_eq!(state.is_terminal(), terminal);
    }

    #[test]
    fn test_open_transaction_starts_initial() {
        let txn = Transaction::open(1, 10, 20, Decimal::new(5000, 2));

        assert_eq!(txn.state, TxnState::Initial);
        assert_eq!(txn.source, 10);
        assert_eq!(txn.destination, 20);
        assert_eq!(txn.value, Decimal::new(5000, 2));
    }

    #[test]
    fn test_filter_on_route_and_state() {
        let txn = Transaction::open(1, 10, 20, Decimal::ONE);

        assert!(txn.matches(
            &TxnFilter::new()
                .source(10)
                .destination(20)
                .state(TxnState::Initial)
        ));
        assert!(!txn.matches(&TxnFilter::new().source(20)));
        assert!(!txn.matches(&TxnFilter::new().state(TxnState::Pending)));
    }

    #[test]
    fn test_modified_before_is_a_strict_bound() {
        let txn = Transaction::open(1, 10, 20, Decimal::ONE);
        let later = txn.last_modified + Duration::from_millis(5);

        assert!(txn.matches(&TxnFilter::new().modified_before(later)));
        assert!(!txn.matches(&TxnFilter::new().modified_before(txn.last_modified)));
    }

    #[test]
    fn test_apply_transition_touches_last_modified() {
        let mut txn = Transaction::open(1, 10, 20, Decimal::ONE);
        let stamp = txn.last_modified + Duration::from_secs(1);

        txn.apply(&TxnUpdate::transition_to(TxnState::Pending), stamp);

        assert_eq!(txn.state, TxnState::Pending);
        assert_eq!(txn.last_modified, stamp);
    }
}
