//! Page document with materialized-path ancestry
//!
//! A page's `path` encodes its chain of ancestors as a comma-delimited
//! string of ids, e.g. `,A,B,C,` for a page whose parents are `A`, `B`,
//! and `C` from the root down. Roots carry no path. Storing ancestry this
//! way lets a subtree query be a prefix match on a single indexed field.

use crate::store::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// One page document in the `pages` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Unique page id
    pub id: String,

    /// Page title; children of one parent are ordered by it
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Materialized ancestor path, `,A,B,C,`; `None` for roots
    pub path: Option<String>,
}

impl Page {
    /// A new root page
    pub fn root(title: impl Into<String>, description: impl Into<String>) -> Self {
        Page {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            path: None,
        }
    }

    /// A new page directly under `parent`
    pub fn child_of(
        title: impl Into<String>,
        description: impl Into<String>,
        parent: &Page,
    ) -> Self {
        let prefix = parent
            .path
            .as_deref()
            .map(|path| path.strip_suffix(',').unwrap_or(path))
            .unwrap_or("");
        Page {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            path: Some(format!("{prefix},{},", parent.id)),
        }
    }
}

/// Query descriptor for page documents
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    /// Equality on the page id
    pub id: Option<String>,
    /// Regex over the materialized path; pages without a path never match
    pub path_matches: Option<Regex>,
}

impl PageFilter {
    /// A filter with no clauses (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the page id to equal `id`
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Require the materialized path to match `regex`
    pub fn path_matches(mut self, regex: Regex) -> Self {
        self.path_matches = Some(regex);
        self
    }
}

/// Pages are only ever written whole (insert or replace), never patched.
#[derive(Debug, Clone, Copy)]
pub enum PageUpdate {}

impl Document for Page {
    type Id = String;
    type Filter = PageFilter;
    type Update = PageUpdate;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn matches(&self, filter: &PageFilter) -> bool {
        if let Some(id) = &filter.id {
            if &self.id != id {
                return false;
            }
        }
        if let Some(regex) = &filter.path_matches {
            match &self.path {
                Some(path) => {
                    if !regex.is_match(path) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    fn apply(&mut self, update: &PageUpdate, _now: SystemTime) {
        match *update {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_page_has_no_path() {
        let root = Page::root("Home", "the landing page");

        assert!(root.path.is_none());
        assert!(!root.id.is_empty());
    }

    #[test]
    fn test_child_of_root_path() {
        let root = Page::root("Home", "");
        let child = Page::child_of("About", "", &root);

        assert_eq!(child.path.as_deref(), Some(format!(",{},", root.id).as_str()));
    }

    #[test]
    fn test_grandchild_path_extends_the_parent_path() {
        let root = Page::root("Home", "");
        let child = Page::child_of("About", "", &root);
        let grandchild = Page::child_of("Team", "", &child);

        assert_eq!(
            grandchild.path.as_deref(),
            Some(format!(",{},{},", root.id, child.id).as_str())
        );
    }

    #[test]
    fn test_path_filter_never_matches_roots() {
        let root = Page::root("Home", "");
        let filter = PageFilter::new().path_matches(Regex::new(".*").unwrap());

        assert!(!root.matches(&filter));
    }
}
