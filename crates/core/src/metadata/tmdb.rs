//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access. Detail endpoints are fetched with
//! `append_to_response=credits,videos` so one round trip carries the whole
//! record.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    EpisodeDetail, MovieDetails, MovieSummary, ProviderCast, ProviderCrew, ProviderGenre,
    ProviderNetwork, ProviderVideo, SeasonDetails, SeasonSummary, SeriesDetails, SeriesSummary,
};
use super::{MetadataError, MetadataProvider};

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Execute a GET and decode the JSON body.
    ///
    /// `not_found` names the resource for 404 mapping; search endpoints
    /// pass `None` because an empty result list is not an error.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        not_found: Option<&str>,
    ) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(MetadataError::NotConfigured(
                "invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(MetadataError::RateLimitExceeded);
        }
        if status == 404 {
            if let Some(what) = not_found {
                return Err(MetadataError::NotFound(what.to_string()));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            MetadataError::ParseError(format!("failed to parse {} response: {}", path, e))
        })
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieSummary>, MetadataError> {
        debug!(query, ?year, "TMDB movie search");

        let mut params = vec![("query", query.to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }

        let result: TmdbSearchResponse<TmdbMovieResult> =
            self.get("/search/movie", &params, None).await?;

        Ok(result.results.into_iter().map(Into::into).collect())
    }

    async fn search_series(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<SeriesSummary>, MetadataError> {
        debug!(query, ?year, "TMDB series search");

        let mut params = vec![("query", query.to_string())];
        if let Some(y) = year {
            params.push(("first_air_date_year", y.to_string()));
        }

        let result: TmdbSearchResponse<TmdbTvResult> =
            self.get("/search/tv", &params, None).await?;

        Ok(result.results.into_iter().map(Into::into).collect())
    }

    async fn movie_details(&self, id: u32) -> Result<MovieDetails, MetadataError> {
        debug!(id, "TMDB get movie");

        let details: TmdbMovieDetails = self
            .get(
                &format!("/movie/{}", id),
                &[("append_to_response", "credits,videos".to_string())],
                Some(&format!("movie {}", id)),
            )
            .await?;

        Ok(details.into())
    }

    async fn series_details(&self, id: u32) -> Result<SeriesDetails, MetadataError> {
        debug!(id, "TMDB get series");

        let details: TmdbTvDetails = self
            .get(
                &format!("/tv/{}", id),
                &[("append_to_response", "credits,videos".to_string())],
                Some(&format!("series {}", id)),
            )
            .await?;

        Ok(details.into())
    }

    async fn season_details(
        &self,
        series_id: u32,
        season_number: u32,
    ) -> Result<SeasonDetails, MetadataError> {
        debug!(series_id, season_number, "TMDB get season");

        let details: TmdbSeasonDetails = self
            .get(
                &format!("/tv/{}/season/{}", series_id, season_number),
                &[],
                Some(&format!("series {} season {}", series_id, season_number)),
            )
            .await?;

        Ok(details.into())
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    popularity: f64,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    id: u32,
    title: String,
    imdb_id: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    popularity: Option<f32>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    credits: TmdbCredits,
    #[serde(default)]
    videos: TmdbVideos,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    id: u32,
    name: String,
    #[serde(default)]
    character: String,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    id: u32,
    name: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    job: String,
    profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbVideos {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    id: String,
    key: String,
    name: String,
    site: String,
    #[serde(rename = "type")]
    video_type: String,
    #[serde(default)]
    official: bool,
}

#[derive(Debug, Deserialize)]
struct TmdbTvResult {
    id: u32,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    popularity: f64,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetails {
    id: u32,
    name: String,
    first_air_date: Option<String>,
    last_air_date: Option<String>,
    status: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    popularity: Option<f32>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    networks: Vec<TmdbNetwork>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonResult>,
    #[serde(default)]
    credits: TmdbCredits,
    #[serde(default)]
    videos: TmdbVideos,
}

#[derive(Debug, Deserialize)]
struct TmdbNetwork {
    id: u32,
    name: String,
    logo_path: Option<String>,
    origin_country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonResult {
    id: u32,
    season_number: u32,
    name: Option<String>,
    episode_count: Option<u32>,
    air_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonDetails {
    id: u32,
    season_number: u32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    episodes: Vec<TmdbEpisodeResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisodeResult {
    id: u32,
    episode_number: u32,
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    still_path: Option<String>,
    vote_average: Option<f32>,
    vote_count: Option<u32>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbMovieResult> for MovieSummary {
    fn from(r: TmdbMovieResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            original_title: r.original_title,
            release_date: r.release_date.filter(|d| !d.is_empty()),
            overview: r.overview,
            poster_path: r.poster_path,
            popularity: r.popularity,
            vote_average: r.vote_average,
        }
    }
}

impl From<TmdbTvResult> for SeriesSummary {
    fn from(r: TmdbTvResult) -> Self {
        Self {
            id: r.id,
            name: r.name,
            original_name: r.original_name,
            first_air_date: r.first_air_date.filter(|d| !d.is_empty()),
            overview: r.overview,
            poster_path: r.poster_path,
            popularity: r.popularity,
            vote_average: r.vote_average,
        }
    }
}

impl From<TmdbGenre> for ProviderGenre {
    fn from(g: TmdbGenre) -> Self {
        Self { id: g.id, name: g.name }
    }
}

impl From<TmdbNetwork> for ProviderNetwork {
    fn from(n: TmdbNetwork) -> Self {
        Self {
            id: n.id,
            name: n.name,
            logo_path: n.logo_path,
            origin_country: n.origin_country,
        }
    }
}

impl From<TmdbCast> for ProviderCast {
    fn from(c: TmdbCast) -> Self {
        Self {
            id: c.id,
            name: c.name,
            character: c.character,
            profile_path: c.profile_path,
        }
    }
}

impl From<TmdbCrew> for ProviderCrew {
    fn from(c: TmdbCrew) -> Self {
        Self {
            id: c.id,
            name: c.name,
            department: c.department,
            job: c.job,
            profile_path: c.profile_path,
        }
    }
}

impl From<TmdbVideo> for ProviderVideo {
    fn from(v: TmdbVideo) -> Self {
        Self {
            id: v.id,
            key: v.key,
            name: v.name,
            site: v.site,
            video_type: v.video_type,
            official: v.official,
        }
    }
}

impl From<TmdbMovieDetails> for MovieDetails {
    fn from(d: TmdbMovieDetails) -> Self {
        Self {
            id: d.id,
            title: d.title,
            imdb_id: d.imdb_id.filter(|i| !i.is_empty()),
            release_date: d.release_date.filter(|r| !r.is_empty()),
            runtime_minutes: d.runtime,
            overview: d.overview,
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
            popularity: d.popularity,
            vote_average: d.vote_average,
            vote_count: d.vote_count,
            genres: d.genres.into_iter().map(Into::into).collect(),
            cast: d.credits.cast.into_iter().map(Into::into).collect(),
            crew: d.credits.crew.into_iter().map(Into::into).collect(),
            videos: d.videos.results.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TmdbTvDetails> for SeriesDetails {
    fn from(d: TmdbTvDetails) -> Self {
        Self {
            id: d.id,
            name: d.name,
            first_air_date: d.first_air_date.filter(|r| !r.is_empty()),
            last_air_date: d.last_air_date.filter(|r| !r.is_empty()),
            status: d.status,
            overview: d.overview,
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
            popularity: d.popularity,
            vote_average: d.vote_average,
            vote_count: d.vote_count,
            number_of_seasons: d.number_of_seasons.unwrap_or(0),
            number_of_episodes: d.number_of_episodes.unwrap_or(0),
            genres: d.genres.into_iter().map(Into::into).collect(),
            networks: d.networks.into_iter().map(Into::into).collect(),
            seasons: d.seasons.into_iter().map(Into::into).collect(),
            cast: d.credits.cast.into_iter().map(Into::into).collect(),
            crew: d.credits.crew.into_iter().map(Into::into).collect(),
            videos: d.videos.results.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TmdbSeasonResult> for SeasonSummary {
    fn from(s: TmdbSeasonResult) -> Self {
        Self {
            provider_id: s.id,
            season_number: s.season_number,
            name: s.name,
            air_date: s.air_date,
            poster_path: s.poster_path,
            episode_count: s.episode_count.unwrap_or(0),
        }
    }
}

impl From<TmdbSeasonDetails> for SeasonDetails {
    fn from(d: TmdbSeasonDetails) -> Self {
        Self {
            provider_id: d.id,
            season_number: d.season_number,
            name: d.name,
            overview: d.overview,
            air_date: d.air_date,
            poster_path: d.poster_path,
            episodes: d.episodes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TmdbEpisodeResult> for EpisodeDetail {
    fn from(e: TmdbEpisodeResult) -> Self {
        Self {
            provider_id: e.id,
            episode_number: e.episode_number,
            name: e.name,
            overview: e.overview,
            air_date: e.air_date,
            still_path: e.still_path,
            vote_average: e.vote_average,
            vote_count: e.vote_count,
        }
    }
}
