//! Store adapter module
//!
//! A thin, typed wrapper over the document store: the [`Document`] trait
//! describes an entity together with its filter and mutation descriptor
//! types, and [`Collection`] executes those descriptors with
//! single-document atomicity. Nothing above this module ever sees an
//! untyped document.
//!
//! The in-process engine in [`collection`] stands in for a store configured
//! with a journaled write concern: once a call returns, the mutation is
//! visible to every reader and survives the writer.

pub mod collection;
pub mod document;

pub use collection::Collection;
pub use document::{Document, StoreError};
