//! Page service: CRUD plus the ancestor-prefix children query

use crate::store::Collection;
use crate::tree::page::{Page, PageFilter};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the page service
#[derive(Debug, Error)]
pub enum TreeError {
    /// The children query could not be compiled
    #[error("invalid children query: {0}")]
    InvalidQuery(#[from] regex::Error),
}

/// The page service over the `pages` collection
pub struct Pages {
    store: Collection<Page>,
}

impl Pages {
    /// Create a page service over an empty collection
    pub fn new() -> Self {
        Pages {
            store: Collection::new(),
        }
    }

    /// Create and persist a page, optionally under a parent
    pub fn create(&self, title: &str, description: &str, parent: Option<&Page>) -> Page {
        let page = match parent {
            Some(parent) => Page::child_of(title, description, parent),
            None => Page::root(title, description),
        };
        self.save(&page);
        debug!("Created page: {page:?}");
        page
    }

    /// Persist a page, replacing any previous version of it
    pub fn save(&self, page: &Page) {
        self.store.save(page.clone());
    }

    /// Read one page by id
    pub fn get(&self, id: &str) -> Option<Page> {
        self.store.find_one(&PageFilter::new().id(id))
    }

    /// Direct children of `parent`, ordered by `(path, title)`
    ///
    /// The query matches pages whose materialized path is exactly the
    /// parent's path extended by the parent's id - i.e. depth-one
    /// descendants only.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidQuery`] if the path expression cannot be
    /// compiled into a regex.
    pub fn children(&self, parent: &Page) -> Result<Vec<Page>, TreeError> {
        let pattern = match &parent.path {
            None => format!("^,{},$", regex::escape(&parent.id)),
            Some(path) => format!("^{}{},$", regex::escape(path), regex::escape(&parent.id)),
        };
        let regex = Regex::new(&pattern)?;
        let mut children = self.store.find(&PageFilter::new().path_matches(regex));
        children.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.title.cmp(&b.title)));
        debug!("Got {} children for page {}", children.len(), parent.id);
        Ok(children)
    }

    /// Delete one page by id
    pub fn delete(&self, id: &str) {
        self.store.delete_many(&PageFilter::new().id(id));
        debug!("Deleted page with id {id}");
    }

    /// Delete every page
    pub fn delete_all(&self) {
        self.store.delete_many(&PageFilter::new());
        debug!("All pages were deleted");
    }

    /// Number of pages in the store
    pub fn count(&self) -> u64 {
        self.store.len() as u64
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self::new()
    }
}
