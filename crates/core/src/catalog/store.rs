//! Catalog storage abstraction.
//!
//! The engine only depends on this narrow trait; the production document
//! store lives behind it. `MemoryCatalog` is the bundled implementation,
//! used by the reconciliation loop and by tests.

use thiserror::Error;

use super::types::{Title, TitleKind};

/// Errors that can occur in catalog storage operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Title not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Query over the catalog.
///
/// `text` queries are relevance-ranked over title + description; without
/// text the result order is by local ID.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Free-text search over title and description.
    pub text: Option<String>,
    /// Restrict to one title kind.
    pub kind: Option<TitleKind>,
    /// Maximum results (0 = unlimited).
    pub limit: usize,
    /// Results to skip before collecting.
    pub skip: usize,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: TitleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// Trait for catalog document storage.
pub trait CatalogStore: Send + Sync {
    /// Insert a title unless its key already exists.
    ///
    /// Duplicate-key conflicts are not errors: returns `false` and leaves
    /// the stored document untouched.
    fn insert_if_absent(&self, title: &Title) -> Result<bool, CatalogError>;

    /// Look up a title by kind and local ID.
    fn find_by_key(&self, kind: TitleKind, local_id: &str) -> Result<Option<Title>, CatalogError>;

    /// Replace the stored document for the title's key.
    fn update_by_key(&self, title: &Title) -> Result<(), CatalogError>;

    /// Run a filtered, optionally full-text-ranked query.
    fn find(&self, query: &CatalogQuery) -> Result<Vec<Title>, CatalogError>;

    /// Number of stored titles of the given kind.
    fn count(&self, kind: TitleKind) -> Result<usize, CatalogError>;
}
