//! In-memory catalog store.
//!
//! Keyed by `(kind, local_id)`. Text search is a token-overlap score over
//! title + description, enough to honor the relevance-ranking contract
//! without a real document store behind it.

use std::collections::HashMap;
use std::sync::RwLock;

use super::store::{CatalogError, CatalogQuery, CatalogStore};
use super::types::{Title, TitleKind};

/// In-memory `CatalogStore` implementation.
#[derive(Default)]
pub struct MemoryCatalog {
    titles: RwLock<HashMap<(TitleKind, String), Title>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize for the naive relevance score.
    fn tokens(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    /// Count of query tokens present in the title (weighted double) and
    /// description.
    fn relevance(title: &Title, query_tokens: &[String]) -> usize {
        let name_tokens = Self::tokens(title.display_name());
        let desc_tokens = match title {
            Title::Movie(m) => Self::tokens(&m.description),
            Title::Series(s) => Self::tokens(&s.description),
        };

        query_tokens
            .iter()
            .map(|qt| {
                let in_name = name_tokens.iter().any(|t| t == qt) as usize;
                let in_desc = desc_tokens.iter().any(|t| t == qt) as usize;
                in_name * 2 + in_desc
            })
            .sum()
    }

    fn lock_err<T>(_: T) -> CatalogError {
        CatalogError::Storage("catalog lock poisoned".to_string())
    }
}

impl CatalogStore for MemoryCatalog {
    fn insert_if_absent(&self, title: &Title) -> Result<bool, CatalogError> {
        let mut titles = self.titles.write().map_err(Self::lock_err)?;
        let key = (title.kind(), title.local_id().to_string());
        if titles.contains_key(&key) {
            return Ok(false);
        }
        titles.insert(key, title.clone());
        Ok(true)
    }

    fn find_by_key(&self, kind: TitleKind, local_id: &str) -> Result<Option<Title>, CatalogError> {
        let titles = self.titles.read().map_err(Self::lock_err)?;
        Ok(titles.get(&(kind, local_id.to_string())).cloned())
    }

    fn update_by_key(&self, title: &Title) -> Result<(), CatalogError> {
        let mut titles = self.titles.write().map_err(Self::lock_err)?;
        let key = (title.kind(), title.local_id().to_string());
        if !titles.contains_key(&key) {
            return Err(CatalogError::NotFound(title.local_id().to_string()));
        }
        titles.insert(key, title.clone());
        Ok(())
    }

    fn find(&self, query: &CatalogQuery) -> Result<Vec<Title>, CatalogError> {
        let titles = self.titles.read().map_err(Self::lock_err)?;

        let mut matched: Vec<Title> = titles
            .values()
            .filter(|t| query.kind.map_or(true, |k| t.kind() == k))
            .cloned()
            .collect();

        match &query.text {
            Some(text) => {
                let query_tokens = Self::tokens(text);
                let mut scored: Vec<(usize, Title)> = matched
                    .into_iter()
                    .map(|t| (Self::relevance(&t, &query_tokens), t))
                    .filter(|(score, _)| *score > 0)
                    .collect();
                // Relevance descending, local ID as the stable tie-break
                scored.sort_by(|a, b| {
                    b.0.cmp(&a.0)
                        .then_with(|| a.1.local_id().cmp(b.1.local_id()))
                });
                matched = scored.into_iter().map(|(_, t)| t).collect();
            }
            None => {
                matched.sort_by(|a, b| a.local_id().cmp(b.local_id()));
            }
        }

        let iter = matched.into_iter().skip(query.skip);
        let results = if query.limit > 0 {
            iter.take(query.limit).collect()
        } else {
            iter.collect()
        };

        Ok(results)
    }

    fn count(&self, kind: TitleKind) -> Result<usize, CatalogError> {
        let titles = self.titles.read().map_err(Self::lock_err)?;
        Ok(titles.keys().filter(|(k, _)| *k == kind).count())
    }
}
