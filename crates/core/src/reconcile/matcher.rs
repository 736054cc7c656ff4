//! Candidate scoring for title reconciliation.
//!
//! Each provider search result is scored on three components: title
//! similarity, release-year proximity and a rank-decayed popularity boost.
//! The best candidate is accepted only at or above the configured
//! threshold; below it the title stays unenriched rather than guessing.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static FILENAME_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("invalid year pattern"));

static PARENTHETICAL_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})\)").expect("invalid year pattern"));

/// Scoring weights and acceptance threshold.
///
/// The defaults are the tuned values this matcher shipped with; every knob
/// is overridable through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Points for an exact normalized title match.
    #[serde(default = "default_exact_title_points")]
    pub exact_title_points: f64,

    /// Scale for Levenshtein-based similarity of non-exact titles.
    #[serde(default = "default_fuzzy_title_points")]
    pub fuzzy_title_points: f64,

    /// Points when release years match exactly.
    #[serde(default = "default_year_exact_points")]
    pub year_exact_points: f64,

    /// Points when release years differ by one.
    #[serde(default = "default_year_close_points")]
    pub year_close_points: f64,

    /// Points when release years differ by two.
    #[serde(default = "default_year_near_points")]
    pub year_near_points: f64,

    /// Popularity contribution cap.
    #[serde(default = "default_popularity_cap")]
    pub popularity_cap: f64,

    /// Popularity decay per provider rank position.
    #[serde(default = "default_rank_decay")]
    pub rank_decay: f64,

    /// Minimum total score to accept a match.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,
}

fn default_exact_title_points() -> f64 {
    50.0
}

fn default_fuzzy_title_points() -> f64 {
    40.0
}

fn default_year_exact_points() -> f64 {
    30.0
}

fn default_year_close_points() -> f64 {
    20.0
}

fn default_year_near_points() -> f64 {
    10.0
}

fn default_popularity_cap() -> f64 {
    20.0
}

fn default_rank_decay() -> f64 {
    0.1
}

fn default_accept_threshold() -> f64 {
    30.0
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            exact_title_points: default_exact_title_points(),
            fuzzy_title_points: default_fuzzy_title_points(),
            year_exact_points: default_year_exact_points(),
            year_close_points: default_year_close_points(),
            year_near_points: default_year_near_points(),
            popularity_cap: default_popularity_cap(),
            rank_decay: default_rank_decay(),
            accept_threshold: default_accept_threshold(),
        }
    }
}

/// A provider search result prepared for scoring.
///
/// Ephemeral: candidates exist only for the duration of one match decision
/// and are never persisted.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub provider_id: u32,
    pub title: String,
    pub year: Option<i32>,
    pub popularity: f64,
}

/// A candidate with its computed score components.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: MatchCandidate,
    /// Provider relevance rank (0 = first result).
    pub rank: usize,
    pub title_score: f64,
    pub year_score: f64,
    pub popularity_score: f64,
    pub total: f64,
}

/// Lowercase a query title and split off a parenthetical year if present.
pub fn normalize_query(title: &str) -> (String, Option<String>) {
    let lowered = title.to_lowercase();

    match PARENTHETICAL_YEAR.captures(&lowered) {
        Some(caps) => {
            let year = caps.get(1).map(|m| m.as_str().to_string());
            let whole = caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
            let stripped = lowered.replacen(&whole, "", 1).trim().to_string();
            (stripped, year)
        }
        None => (lowered.trim().to_string(), None),
    }
}

/// Extract a plausible release year from a filename.
///
/// Only years between 1900 and the current year qualify, so resolution
/// tags like `2160p` never leak through.
pub fn extract_year(filename: &str) -> Option<String> {
    let caps = FILENAME_YEAR.captures(filename)?;
    let year = caps.get(1)?.as_str();
    let value: i32 = year.parse().ok()?;

    let current = Utc::now().year();
    if (1900..=current).contains(&value) {
        Some(year.to_string())
    } else {
        None
    }
}

/// Char-level Levenshtein edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *val = j;
    }

    for (i, a_char) in a_chars.iter().enumerate() {
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1)
                .min(matrix[i + 1][j] + 1)
                .min(matrix[i][j] + cost);
        }
    }

    matrix[a_len][b_len]
}

/// Normalized similarity in [0, 1]: 1 minus the edit distance scaled by
/// the longer string's length.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Score every candidate against the query, best first.
///
/// Ties on total score break on higher raw title similarity, then on the
/// earlier provider rank, so the outcome is deterministic.
pub fn score_candidates(
    query_title: &str,
    year_hint: Option<&str>,
    candidates: &[MatchCandidate],
    config: &MatcherConfig,
) -> Vec<ScoredCandidate> {
    let (normalized, title_year) = normalize_query(query_title);
    let query_year: Option<i32> = title_year
        .as_deref()
        .or(year_hint)
        .and_then(|y| y.parse().ok());

    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(rank, candidate)| {
            let candidate_title = candidate.title.to_lowercase();

            let title_score = if candidate_title == normalized {
                config.exact_title_points
            } else {
                config.fuzzy_title_points * string_similarity(&normalized, &candidate_title)
            };

            let year_score = match (query_year, candidate.year) {
                (Some(q), Some(c)) => {
                    let diff = (q - c).abs();
                    if diff == 0 {
                        config.year_exact_points
                    } else if diff == 1 {
                        config.year_close_points
                    } else if diff == 2 {
                        config.year_near_points
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            };

            let popularity_score = candidate.popularity.min(config.popularity_cap)
                * (1.0 - rank as f64 * config.rank_decay);

            ScoredCandidate {
                candidate: candidate.clone(),
                rank,
                title_score,
                year_score,
                popularity_score,
                total: title_score + year_score + popularity_score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.title_score
                    .partial_cmp(&a.title_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.rank.cmp(&b.rank))
    });

    scored
}

/// The best-scoring candidate, if it clears the acceptance threshold.
pub fn best_match(
    query_title: &str,
    year_hint: Option<&str>,
    candidates: &[MatchCandidate],
    config: &MatcherConfig,
) -> Option<ScoredCandidate> {
    score_candidates(query_title, year_hint, candidates, config)
        .into_iter()
        .next()
        .filter(|best| best.total >= config.accept_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(id: u32, title: &str, year: Option<i32>, popularity: f64) -> MatchCandidate {
        MatchCandidate {
            provider_id: id,
            title: title.to_string(),
            year,
            popularity,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.exact_title_points, 50.0);
        assert_eq!(config.fuzzy_title_points, 40.0);
        assert_eq!(config.year_exact_points, 30.0);
        assert_eq!(config.popularity_cap, 20.0);
        assert_eq!(config.accept_threshold, 30.0);
    }

    #[test]
    fn test_extract_year_from_filename() {
        assert_eq!(
            extract_year("Movie.Title.1999.BluRay.mp4").as_deref(),
            Some("1999")
        );
        assert_eq!(extract_year("Movie.Title.mp4"), None);
        assert_eq!(
            extract_year("Tarzan.Goes.To.India.1962.1080p.x264.mp4").as_deref(),
            Some("1962")
        );
        // Resolution tags are not years
        assert_eq!(extract_year("Show.2160p.mkv"), None);
        // Future years rejected
        assert_eq!(extract_year("Movie.2099.mp4"), None);
    }

    #[test]
    fn test_normalize_query_strips_parenthetical_year() {
        let (title, year) = normalize_query("The Thing (1982)");
        assert_eq!(title, "the thing");
        assert_eq!(year.as_deref(), Some("1982"));

        let (title, year) = normalize_query("No Year Here");
        assert_eq!(title, "no year here");
        assert_eq!(year, None);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("alpha", "beta"), 4);
    }

    #[test]
    fn test_string_similarity_bounds() {
        assert_eq!(string_similarity("same", "same"), 1.0);
        assert_eq!(string_similarity("aaaa", "bbbb"), 0.0);
        let partial = string_similarity("abcd", "abce");
        assert!(partial > 0.7 && partial < 1.0);
    }

    #[test]
    fn test_exact_title_and_year_beats_popular_mismatch() {
        // Local "Alpha" (2020): the exact match wins over a popular
        // unrelated title at rank 1.
        let candidates = vec![
            make_candidate(1, "Alpha", Some(2020), 5.0),
            make_candidate(2, "Beta", Some(1990), 50.0),
        ];

        let best = best_match("Alpha", Some("2020"), &candidates, &MatcherConfig::default())
            .expect("should match");

        assert_eq!(best.candidate.provider_id, 1);
        // 50 exact + 30 year + 5 popularity
        assert!((best.total - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = MatcherConfig::default();

        // Title completely dissimilar (0) + exact year (30) = 30.0
        let at_threshold = vec![make_candidate(1, "bbbb", Some(2000), 0.0)];
        assert!(best_match("aaaa", Some("2000"), &at_threshold, &config).is_some());

        // Title 0 + year off by one (20) + popularity 9.9 = 29.9
        let below = vec![make_candidate(1, "bbbb", Some(2001), 9.9)];
        assert!(best_match("aaaa", Some("2000"), &below, &config).is_none());
    }

    #[test]
    fn test_year_proximity_scoring() {
        let config = MatcherConfig::default();
        let score = |year: i32| {
            score_candidates(
                "aaaa",
                Some("2000"),
                &[make_candidate(1, "bbbb", Some(year), 0.0)],
                &config,
            )[0]
            .year_score
        };

        assert_eq!(score(2000), 30.0);
        assert_eq!(score(2001), 20.0);
        assert_eq!(score(1999), 20.0);
        assert_eq!(score(2002), 10.0);
        assert_eq!(score(2005), 0.0);
    }

    #[test]
    fn test_unknown_year_scores_zero() {
        let config = MatcherConfig::default();

        let scored = score_candidates(
            "aaaa",
            None,
            &[make_candidate(1, "bbbb", Some(2000), 0.0)],
            &config,
        );
        assert_eq!(scored[0].year_score, 0.0);

        let scored = score_candidates(
            "aaaa",
            Some("2000"),
            &[make_candidate(1, "bbbb", None, 0.0)],
            &config,
        );
        assert_eq!(scored[0].year_score, 0.0);
    }

    #[test]
    fn test_popularity_capped_and_rank_decayed() {
        let config = MatcherConfig::default();
        let candidates = vec![
            make_candidate(1, "zzzz", None, 100.0),
            make_candidate(2, "zzzz", None, 100.0),
        ];

        let scored = score_candidates("zzzz", None, &candidates, &config);

        // Both are exact matches; rank 0 keeps the full capped boost,
        // rank 1 is decayed by 10%.
        let first = scored.iter().find(|s| s.rank == 0).unwrap();
        let second = scored.iter().find(|s| s.rank == 1).unwrap();
        assert!((first.popularity_score - 20.0).abs() < 1e-9);
        assert!((second.popularity_score - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_breaks_on_title_score_then_rank() {
        let config = MatcherConfig::default();

        // rank 0: title 20 (half similar) + year 30 = 50
        // rank 1: title 50 (exact) + year 0 = 50
        let candidates = vec![
            make_candidate(1, "aa", Some(2000), 0.0),
            make_candidate(2, "ab", None, 0.0),
        ];

        let scored = score_candidates("ab", Some("2000"), &candidates, &config);
        assert!((scored[0].total - scored[1].total).abs() < 1e-9);
        assert_eq!(scored[0].candidate.provider_id, 2, "higher title score wins the tie");

        // Fully identical candidates: earlier rank wins
        let twins = vec![
            make_candidate(7, "same", Some(2000), 3.0),
            make_candidate(8, "same", Some(2000), 3.0),
        ];
        let scored = score_candidates("same", Some("2000"), &twins, &config);
        assert_eq!(scored[0].candidate.provider_id, 7);
    }

    #[test]
    fn test_parenthetical_year_preferred_over_hint() {
        let config = MatcherConfig::default();
        let candidates = vec![make_candidate(1, "the thing", Some(1982), 0.0)];

        // The title's own (1982) outranks the (wrong) filename hint
        let best = best_match("The Thing (1982)", Some("2011"), &candidates, &config).unwrap();
        assert_eq!(best.year_score, 30.0);
    }

    #[test]
    fn test_no_candidates_no_match() {
        assert!(best_match("anything", None, &[], &MatcherConfig::default()).is_none());
    }
}
