//! Tree-of-pages module
//!
//! A thin CRUD layer over a `pages` collection, independent of the banking
//! core but sharing its store adapter. Ancestry is materialized into a
//! delimited path string per page, so fetching a node's children is a
//! single prefix-regex query instead of a recursive walk.

pub mod page;
pub mod service;

pub use page::{Page, PageFilter, PageUpdate};
pub use service::{Pages, TreeError};
