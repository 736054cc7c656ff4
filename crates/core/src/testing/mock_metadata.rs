//! Mock metadata provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{
    MetadataError, MetadataProvider, MovieDetails, MovieSummary, SeasonDetails, SeriesDetails,
    SeriesSummary,
};

/// A recorded provider query for test assertions.
#[derive(Debug, Clone)]
pub enum RecordedQuery {
    SearchMovies { query: String, year: Option<u32> },
    SearchSeries { query: String, year: Option<u32> },
    MovieDetails { id: u32 },
    SeriesDetails { id: u32 },
    SeasonDetails { series_id: u32, season_number: u32 },
}

/// Mock implementation of the `MetadataProvider` trait.
///
/// Search results are returned in the order they were configured (that is
/// the provider's relevance rank); when a year is given, results are
/// filtered to it. Queries are recorded for assertions and the next
/// operation can be made to fail.
#[derive(Default)]
pub struct MockMetadataProvider {
    movie_results: Arc<RwLock<Vec<MovieSummary>>>,
    series_results: Arc<RwLock<Vec<SeriesSummary>>>,
    movies: Arc<RwLock<HashMap<u32, MovieDetails>>>,
    series: Arc<RwLock<HashMap<u32, SeriesDetails>>>,
    seasons: Arc<RwLock<HashMap<(u32, u32), SeasonDetails>>>,
    queries: Arc<RwLock<Vec<RecordedQuery>>>,
    next_error: Arc<RwLock<Option<MetadataError>>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movie search results, in relevance order.
    pub async fn set_movie_results(&self, results: Vec<MovieSummary>) {
        *self.movie_results.write().await = results;
    }

    /// Set the series search results, in relevance order.
    pub async fn set_series_results(&self, results: Vec<SeriesSummary>) {
        *self.series_results.write().await = results;
    }

    /// Add a movie detail record.
    pub async fn add_movie(&self, details: MovieDetails) {
        self.movies.write().await.insert(details.id, details);
    }

    /// Add a series detail record.
    pub async fn add_series(&self, details: SeriesDetails) {
        self.series.write().await.insert(details.id, details);
    }

    /// Add a season detail record.
    pub async fn add_season(&self, series_id: u32, details: SeasonDetails) {
        self.seasons
            .write()
            .await
            .insert((series_id, details.season_number), details);
    }

    /// All recorded queries so far.
    pub async fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.queries.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<MetadataError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, query: RecordedQuery) {
        self.queries.write().await.push(query);
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieSummary>, MetadataError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedQuery::SearchMovies {
            query: query.to_string(),
            year,
        })
        .await;

        let results = self.movie_results.read().await;
        Ok(results
            .iter()
            .filter(|m| year.map_or(true, |y| m.year() == Some(y as i32)))
            .cloned()
            .collect())
    }

    async fn search_series(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<SeriesSummary>, MetadataError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedQuery::SearchSeries {
            query: query.to_string(),
            year,
        })
        .await;

        let results = self.series_results.read().await;
        Ok(results
            .iter()
            .filter(|s| year.map_or(true, |y| s.year() == Some(y as i32)))
            .cloned()
            .collect())
    }

    async fn movie_details(&self, id: u32) -> Result<MovieDetails, MetadataError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedQuery::MovieDetails { id }).await;

        self.movies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("movie {} not found", id)))
    }

    async fn series_details(&self, id: u32) -> Result<SeriesDetails, MetadataError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedQuery::SeriesDetails { id }).await;

        self.series
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("series {} not found", id)))
    }

    async fn season_details(
        &self,
        series_id: u32,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedQuery::SeasonDetails {
            series_id,
            season_number,
        })
        .await;

        self.seasons
            .read()
            .await
            .get(&(series_id, season_number))
            .cloned()
            .ok_or_else(|| {
                MetadataError::NotFound(format!(
                    "season {} of series {} not found",
                    season_number, series_id
                ))
            })
    }
}
