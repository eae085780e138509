//! In-process collection engine with single-document atomicity
//!
//! `Collection<T>` provides the handful of primitives the banking core
//! needs: insert, upsert, point and cursor reads, conditional updates with
//! a matched count, bulk delete, and a sort-by-id-descending/limit-1 read
//! for ID allocation.
//!
//! # Atomicity
//!
//! Documents live in a `DashMap`, whose sharded locking guarantees that a
//! filter check and the subsequent mutation of one document happen under
//! that document's shard write lock. That is exactly the "single-document
//! atomic conditional update" a journaled document store offers, and it is
//! the only atomicity primitive the rest of the crate assumes.
//!
//! # Matched counts
//!
//! `update_one`/`update_many` return how many documents matched the filter.
//! The distinction between "applied" (1) and "no-op because the filter did
//! not match" (0) is load-bearing for the idempotence of the transfer
//! protocol: replaying a guarded step after a crash must silently match
//! nothing.

use crate::store::document::{Document, StoreError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::SystemTime;

/// A collection of documents keyed by `T::Id`
pub struct Collection<T: Document> {
    documents: DashMap<T::Id, T>,
}

impl<T: Document> Collection<T> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Insert a new document
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if a document with the same id
    /// is already present.
    pub fn insert(&self, doc: T) -> Result<(), StoreError> {
        match self.documents.entry(doc.id()) {
            Entry::Occupied(existing) => Err(StoreError::DuplicateKey {
                key: existing.key().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(())
            }
        }
    }

    /// Insert or fully replace a document (upsert by id)
    pub fn save(&self, doc: T) {
        self.documents.insert(doc.id(), doc);
    }

    /// Return a snapshot of one document matching `filter`, if any
    ///
    /// When several documents match, which one is returned is unspecified;
    /// callers that need a unique answer must pin the filter down to one
    /// document.
    pub fn find_one(&self, filter: &T::Filter) -> Option<T> {
        self.documents
            .iter()
            .find(|entry| entry.value().matches(filter))
            .map(|entry| entry.value().clone())
    }

    /// Return snapshots of all documents matching `filter`
    ///
    /// The cursor is materialized eagerly; order is unspecified.
    pub fn find(&self, filter: &T::Filter) -> Vec<T> {
        self.documents
            .iter()
            .filter(|entry| entry.value().matches(filter))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Atomically update at most one document matching `filter`
    ///
    /// The filter is re-evaluated under the document's lock immediately
    /// before the mutation, so a concurrent writer can never slip between
    /// the check and the update.
    ///
    /// Returns the matched count: `1` if a document was updated, `0` if the
    /// filter matched nothing.
    pub fn update_one(&self, filter: &T::Filter, update: &T::Update) -> u64 {
        let now = SystemTime::now();
        for mut entry in self.documents.iter_mut() {
            if entry.value().matches(filter) {
                entry.value_mut().apply(update, now);
                return 1;
            }
        }
        0
    }

    /// Atomically update every document matching `filter`, one at a time
    ///
    /// Each document is checked and mutated under its own lock; there is no
    /// cross-document atomicity. Returns the matched count.
    pub fn update_many(&self, filter: &T::Filter, update: &T::Update) -> u64 {
        let now = SystemTime::now();
        let mut matched = 0;
        for mut entry in self.documents.iter_mut() {
            if entry.value().matches(filter) {
                entry.value_mut().apply(update, now);
                matched += 1;
            }
        }
        matched
    }

    /// Delete every document matching `filter`; returns how many were removed
    pub fn delete_many(&self, filter: &T::Filter) -> u64 {
        let before = self.documents.len();
        self.documents.retain(|_, doc| !doc.matches(filter));
        (before - self.documents.len()) as u64
    }

    /// The document with the greatest id, if the collection is non-empty
    ///
    /// Equivalent to a find sorted by id descending with limit 1; used by
    /// the sequence allocator.
    pub fn latest_by_id(&self) -> Option<T> {
        self.documents
            .iter()
            .max_by(|a, b| a.key().cmp(b.key()))
            .map(|entry| entry.value().clone())
    }

    /// Number of documents in the collection
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<T: Document> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::{Account, AccountFilter, AccountUpdate};
    use rust_decimal::Decimal;

    fn collection_with(ids: &[u32]) -> Collection<Account> {
        let collection = Collection::new();
        for &id in ids {
            collection.insert(Account::new(id)).unwrap();
        }
        collection
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let collection = collection_with(&[1]);

        let result = collection.insert(Account::new(1));

        assert_eq!(
            result,
            Err(StoreError::DuplicateKey {
                key: "1".to_string()
            })
        );
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_find_one_with_default_filter_matches_anything() {
        let collection = collection_with(&[7]);

        let found = collection.find_one(&AccountFilter::default());

        assert_eq!(found.map(|account| account.id), Some(7));
    }

    #[test]
    fn test_find_one_returns_none_when_filter_matches_nothing() {
        let collection = collection_with(&[1, 2]);

        assert!(collection.find_one(&AccountFilter::new().id(3)).is_none());
    }

    #[test]
    fn test_update_one_returns_matched_count() {
        let collection = collection_with(&[1]);

        let hit = collection.update_one(
            &AccountFilter::new().id(1),
            &AccountUpdate::new().inc_balance(Decimal::new(500, 2)),
        );
        let miss = collection.update_one(
            &AccountFilter::new().id(2),
            &AccountUpdate::new().inc_balance(Decimal::new(500, 2)),
        );

        assert_eq!(hit, 1);
        assert_eq!(miss, 0);
        let account = collection.find_one(&AccountFilter::new().id(1)).unwrap();
        assert_eq!(account.balance, Decimal::new(500, 2));
    }

    #[test]
    fn test_update_one_touches_at_most_one_document() {
        let collection = collection_with(&[1, 2, 3]);

        // All three documents match an open-accounts filter, but only one
        // may be updated.
        let matched = collection.update_one(
            &AccountFilter::new().open(),
            &AccountUpdate::new().inc_balance(Decimal::ONE),
        );

        assert_eq!(matched, 1);
        let credited = collection
            .find(&AccountFilter::default())
            .into_iter()
            .filter(|account| account.balance == Decimal::ONE)
            .count();
        assert_eq!(credited, 1);
    }

    #[test]
    fn test_update_many_touches_all_matching_documents() {
        let collection = collection_with(&[1, 2, 3]);
        collection.update_one(
            &AccountFilter::new().id(2),
            &AccountUpdate::new().set_closed(true),
        );

        let matched = collection.update_many(
            &AccountFilter::new().open(),
            &AccountUpdate::new().inc_balance(Decimal::ONE),
        );

        assert_eq!(matched, 2);
        let closed = collection.find_one(&AccountFilter::new().id(2)).unwrap();
        assert_eq!(closed.balance, Decimal::ZERO);
    }

    #[test]
    fn test_delete_many_with_default_filter_empties_the_collection() {
        let collection = collection_with(&[1, 2, 3]);

        let removed = collection.delete_many(&AccountFilter::default());

        assert_eq!(removed, 3);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_latest_by_id() {
        let collection = collection_with(&[3, 1, 2]);

        assert_eq!(collection.latest_by_id().map(|account| account.id), Some(3));
        assert!(Collection::<Account>::new().latest_by_id().is_none());
    }

    #[test]
    fn test_save_replaces_existing_document() {
        let collection = collection_with(&[1]);
        let mut replacement = Account::new(1);
        replacement.balance = Decimal::new(4200, 2);

        collection.save(replacement);

        let account = collection.find_one(&AccountFilter::new().id(1)).unwrap();
        assert_eq!(account.balance, Decimal::new(4200, 2));
        assert_eq!(collection.len(), 1);
    }
}
