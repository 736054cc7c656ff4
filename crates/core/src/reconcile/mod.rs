//! Reconciliation of discovered titles with canonical metadata.
//!
//! `matcher` scores provider search results; `sync` drives the per-title
//! state machine and merges matched metadata into the catalog.

pub mod matcher;
mod sync;

pub use matcher::{
    best_match, extract_year, levenshtein, normalize_query, score_candidates, string_similarity,
    MatchCandidate, MatcherConfig, ScoredCandidate,
};
pub use sync::{SyncConfig, SyncError, SyncOutcome, SyncReport, SyncService};
