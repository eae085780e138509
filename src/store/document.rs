//! The typed document capability that the banking core is written against
//!
//! A store backend only has to provide single-document atomic conditional
//! updates; everything else (multi-document atomicity, recovery) is built on
//! top of that primitive by the core. The [`Document`] trait captures the
//! contract: each entity carries its own well-typed filter and mutation
//! descriptor types, so an update can only ever express the predicates and
//! operators the protocol actually relies on.

use std::fmt::Display;
use std::hash::Hash;
use std::time::SystemTime;
use thiserror::Error;

/// A document that can live in a [`Collection`](crate::store::Collection)
///
/// Implementors supply two descriptor types:
///
/// - `Filter` - the query predicates a caller may combine (equality,
///   set-membership and its negation, timestamp upper bounds). A default
///   filter matches every document.
/// - `Update` - the mutation operators a caller may combine (increment,
///   push, pull, set, touch-timestamp).
///
/// Both are plain data, not closures: the store evaluates `matches` and
/// `apply` while holding the document's lock, which is what makes a
/// conditional update atomic at the single-document level.
pub trait Document: Clone + Send + Sync + 'static {
    /// Unique key of the document within its collection
    type Id: Clone + Eq + Ord + Hash + Display + Send + Sync + 'static;

    /// Query descriptor; a default-constructed filter matches all documents
    type Filter;

    /// Mutation descriptor applied under the document lock
    type Update;

    /// The document's key
    fn id(&self) -> Self::Id;

    /// Whether this document satisfies every clause of `filter`
    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Apply every clause of `update` to this document
    ///
    /// `now` is the store's clock at the moment the update is executed; it
    /// backs timestamp-touching clauses so that ages are always measured
    /// against a single clock.
    fn apply(&mut self, update: &Self::Update, now: SystemTime);
}

/// Errors surfaced by the store adapter itself
///
/// The in-process engine can only fail on a key collision; a driver-backed
/// adapter would add its transport and write-concern failures here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An insert collided with an existing document key
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The key that was already present
        key: String,
    },
}
