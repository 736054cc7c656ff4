//! Metadata provider integration.
//!
//! The reconciliation engine queries a canonical metadata provider through
//! the `MetadataProvider` trait; `TmdbClient` is the production
//! implementation.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when querying the metadata provider.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("client not configured: {0}")]
    NotConfigured(String),
}

/// Trait for canonical metadata providers.
///
/// Search results are returned in the provider's relevance order; the
/// matcher relies on that rank.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search movies by title text, optionally constrained to a year.
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieSummary>, MetadataError>;

    /// Search series by title text, optionally constrained to a year.
    async fn search_series(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<SeriesSummary>, MetadataError>;

    /// Fetch a movie's full detail record.
    async fn movie_details(&self, id: u32) -> Result<MovieDetails, MetadataError>;

    /// Fetch a series' full detail record.
    async fn series_details(&self, id: u32) -> Result<SeriesDetails, MetadataError>;

    /// Fetch one season of a series with its episodes.
    async fn season_details(
        &self,
        series_id: u32,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError>;
}
