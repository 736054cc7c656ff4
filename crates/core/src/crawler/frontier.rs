//! Frontier of already-processed discovery keys.

use std::collections::HashSet;
use std::sync::RwLock;

/// Thread-safe "already seen" set over canonical URLs and content IDs.
///
/// Used both to skip duplicate fetches and to skip duplicate persistence of
/// the same title within one run. Constructor-created and shared by `Arc`;
/// there is no process-global instance.
#[derive(Debug, Default)]
pub struct Frontier {
    seen: RwLock<HashSet<String>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark a key as seen.
    ///
    /// Returns `true` only for the first caller that marks a given key;
    /// every later call for the same key returns `false`.
    pub fn mark_if_absent(&self, key: &str) -> bool {
        let mut seen = self.seen.write().expect("frontier lock poisoned");
        seen.insert(key.to_string())
    }

    /// Whether a key has already been marked.
    pub fn contains(&self, key: &str) -> bool {
        let seen = self.seen.read().expect("frontier lock poisoned");
        seen.contains(key)
    }

    /// Number of marked keys.
    pub fn len(&self) -> usize {
        let seen = self.seen.read().expect("frontier lock poisoned");
        seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
