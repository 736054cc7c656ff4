//! Title reconciliation against the metadata provider.
//!
//! Per title: `Unmatched → Searching → {Matched | NoMatch}`. A stored
//! provider ID short-circuits to a detail fetch and only falls back to
//! searching when that fetch fails. Matching merges descriptive metadata
//! into the title; discovered files and links are never touched, and
//! seasons/episodes absent locally are never created from metadata.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::matcher::{self, MatchCandidate, MatcherConfig};
use crate::catalog::{
    CastMember, CatalogError, CatalogQuery, CatalogStore, CrewMember, Genre, Movie, MovieMetadata,
    Network, Series, SeriesMetadata, Title, TitleKind, VideoClip,
};
use crate::metadata::{
    MetadataError, MetadataProvider, MovieDetails, MovieSummary, ProviderCast, ProviderCrew,
    ProviderGenre, ProviderVideo, SeriesDetails, SeriesSummary,
};

/// Crew jobs worth carrying for movies.
const MOVIE_CREW_JOBS: [&str; 4] = ["Director", "Writer", "Producer", "Screenplay"];

/// Crew jobs worth carrying for series.
const SERIES_CREW_JOBS: [&str; 3] = ["Creator", "Executive Producer", "Director"];

/// Cast members kept per title, in provider order.
const MAX_CAST: usize = 10;

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Pause between titles (milliseconds), to stay under provider limits.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Store page size when iterating titles.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_pacing_ms() -> u64 {
    200
}

fn default_page_size() -> usize {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            page_size: default_page_size(),
        }
    }
}

/// Outcome of reconciling one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Provider metadata was merged into the title.
    Matched,
    /// No candidate cleared the threshold; the title stays unenriched.
    NoMatch,
    /// The title was not eligible (wrong kind for the requested pass).
    Skipped,
}

/// End-of-run reconciliation accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub matched: usize,
    pub no_match: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Errors that abort a whole reconciliation pass.
///
/// Per-title provider failures are counted and logged, never propagated.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("metadata provider error: {0}")]
    Provider(#[from] MetadataError),

    #[error("catalog store error: {0}")]
    Store(#[from] CatalogError),
}

/// Reconciles locally discovered titles with the canonical provider.
pub struct SyncService {
    provider: Arc<dyn MetadataProvider>,
    store: Arc<dyn CatalogStore>,
    matcher: MatcherConfig,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        store: Arc<dyn CatalogStore>,
        matcher: MatcherConfig,
        config: SyncConfig,
    ) -> Self {
        Self {
            provider,
            store,
            matcher,
            config,
        }
    }

    /// Reconcile every movie in the store.
    pub async fn sync_all_movies(&self) -> Result<SyncReport, SyncError> {
        self.sync_all(TitleKind::Movie).await
    }

    /// Reconcile every series in the store.
    pub async fn sync_all_series(&self) -> Result<SyncReport, SyncError> {
        self.sync_all(TitleKind::Series).await
    }

    async fn sync_all(&self, kind: TitleKind) -> Result<SyncReport, SyncError> {
        let total = self.store.count(kind)?;
        let mut report = SyncReport::default();
        let mut skip = 0usize;
        let mut position = 0usize;

        loop {
            let page = self.store.find(
                &CatalogQuery::new()
                    .with_kind(kind)
                    .with_limit(self.config.page_size)
                    .with_skip(skip),
            )?;
            if page.is_empty() {
                break;
            }
            skip += page.len();

            for title in page {
                position += 1;
                info!(
                    position,
                    total,
                    title = %title.display_name(),
                    "syncing title"
                );

                let outcome = match title {
                    Title::Movie(movie) if kind == TitleKind::Movie => {
                        let mut movie = movie;
                        match self.sync_movie(&mut movie).await {
                            Ok(SyncOutcome::Matched) => {
                                match self.store.update_by_key(&Title::Movie(movie)) {
                                    Ok(()) => SyncOutcome::Matched,
                                    Err(e) => {
                                        warn!(error = %e, "failed to persist matched movie");
                                        report.failed += 1;
                                        continue;
                                    }
                                }
                            }
                            Ok(outcome) => outcome,
                            Err(e) => {
                                warn!(error = %e, "movie sync failed");
                                report.failed += 1;
                                continue;
                            }
                        }
                    }
                    Title::Series(series) if kind == TitleKind::Series => {
                        let mut series = series;
                        match self.sync_series(&mut series).await {
                            Ok(SyncOutcome::Matched) => {
                                match self.store.update_by_key(&Title::Series(series)) {
                                    Ok(()) => SyncOutcome::Matched,
                                    Err(e) => {
                                        warn!(error = %e, "failed to persist matched series");
                                        report.failed += 1;
                                        continue;
                                    }
                                }
                            }
                            Ok(outcome) => outcome,
                            Err(e) => {
                                warn!(error = %e, "series sync failed");
                                report.failed += 1;
                                continue;
                            }
                        }
                    }
                    _ => SyncOutcome::Skipped,
                };

                match outcome {
                    SyncOutcome::Matched => report.matched += 1,
                    SyncOutcome::NoMatch => report.no_match += 1,
                    SyncOutcome::Skipped => report.skipped += 1,
                }

                tokio::time::sleep(Duration::from_millis(self.config.pacing_ms)).await;
            }
        }

        info!(
            kind = kind.artifact_prefix(),
            matched = report.matched,
            no_match = report.no_match,
            failed = report.failed,
            skipped = report.skipped,
            "reconciliation finished"
        );

        Ok(report)
    }

    /// Reconcile one movie in place.
    pub async fn sync_movie(&self, movie: &mut Movie) -> Result<SyncOutcome, SyncError> {
        // A stored provider ID is authoritative: go straight to details
        if let Some(md) = &movie.metadata {
            match self.provider.movie_details(md.provider_id).await {
                Ok(details) => {
                    apply_movie_details(movie, &details);
                    return Ok(SyncOutcome::Matched);
                }
                Err(e) => {
                    warn!(
                        id = %movie.movie_id,
                        provider_id = md.provider_id,
                        error = %e,
                        "stored provider ID failed, falling back to search"
                    );
                }
            }
        }

        let year_hint = movie
            .files
            .first()
            .and_then(|f| matcher::extract_year(&f.name));

        let results = self
            .search_movies_with_fallback(&movie.title, year_hint.as_deref())
            .await?;
        if results.is_empty() {
            debug!(title = %movie.title, "no search results");
            return Ok(SyncOutcome::NoMatch);
        }

        let candidates: Vec<MatchCandidate> = results.iter().map(movie_candidate).collect();
        let best = match matcher::best_match(
            &movie.title,
            year_hint.as_deref(),
            &candidates,
            &self.matcher,
        ) {
            Some(best) => best,
            None => {
                debug!(title = %movie.title, "no candidate cleared the threshold");
                return Ok(SyncOutcome::NoMatch);
            }
        };

        info!(
            title = %movie.title,
            matched = %best.candidate.title,
            provider_id = best.candidate.provider_id,
            score = best.total,
            "movie matched"
        );

        let details = self.provider.movie_details(best.candidate.provider_id).await?;
        apply_movie_details(movie, &details);

        Ok(SyncOutcome::Matched)
    }

    /// Reconcile one series in place, including its seasons and episodes.
    pub async fn sync_series(&self, series: &mut Series) -> Result<SyncOutcome, SyncError> {
        if let Some(md) = &series.metadata {
            match self.provider.series_details(md.provider_id).await {
                Ok(details) => {
                    apply_series_details(series, &details);
                    self.reconcile_seasons(series, &details).await;
                    return Ok(SyncOutcome::Matched);
                }
                Err(e) => {
                    warn!(
                        id = %series.series_id,
                        provider_id = md.provider_id,
                        error = %e,
                        "stored provider ID failed, falling back to search"
                    );
                }
            }
        }

        let year_hint = first_series_file_name(series).and_then(|name| matcher::extract_year(&name));

        let results = self
            .search_series_with_fallback(&series.title, year_hint.as_deref())
            .await?;
        if results.is_empty() {
            debug!(title = %series.title, "no search results");
            return Ok(SyncOutcome::NoMatch);
        }

        let candidates: Vec<MatchCandidate> = results.iter().map(series_candidate).collect();
        let best = match matcher::best_match(
            &series.title,
            year_hint.as_deref(),
            &candidates,
            &self.matcher,
        ) {
            Some(best) => best,
            None => {
                debug!(title = %series.title, "no candidate cleared the threshold");
                return Ok(SyncOutcome::NoMatch);
            }
        };

        info!(
            title = %series.title,
            matched = %best.candidate.title,
            provider_id = best.candidate.provider_id,
            score = best.total,
            "series matched"
        );

        let details = self
            .provider
            .series_details(best.candidate.provider_id)
            .await?;
        apply_series_details(series, &details);
        self.reconcile_seasons(series, &details).await;

        Ok(SyncOutcome::Matched)
    }

    /// Search with the year constraint, retrying once bare if it finds
    /// nothing.
    async fn search_movies_with_fallback(
        &self,
        title: &str,
        year_hint: Option<&str>,
    ) -> Result<Vec<MovieSummary>, MetadataError> {
        let year = year_hint.and_then(|y| y.parse::<u32>().ok());
        let results = self.provider.search_movies(title, year).await?;
        if results.is_empty() && year.is_some() {
            debug!(title, "no results with year constraint, retrying bare title");
            return self.provider.search_movies(title, None).await;
        }
        Ok(results)
    }

    async fn search_series_with_fallback(
        &self,
        title: &str,
        year_hint: Option<&str>,
    ) -> Result<Vec<SeriesSummary>, MetadataError> {
        let year = year_hint.and_then(|y| y.parse::<u32>().ok());
        let results = self.provider.search_series(title, year).await?;
        if results.is_empty() && year.is_some() {
            debug!(title, "no results with year constraint, retrying bare title");
            return self.provider.search_series(title, None).await;
        }
        Ok(results)
    }

    /// Enrich locally present seasons/episodes with provider detail.
    ///
    /// Season 0 (specials) and anything not discovered locally is
    /// skipped; reconciliation never fabricates structure. Per-season
    /// fetch failures log and move on.
    async fn reconcile_seasons(&self, series: &mut Series, details: &SeriesDetails) {
        for provider_season in &details.seasons {
            if provider_season.season_number == 0 {
                continue;
            }

            let local = match series
                .seasons
                .iter_mut()
                .find(|s| s.number == provider_season.season_number)
            {
                Some(season) => season,
                None => continue,
            };

            local.provider_id = Some(provider_season.provider_id);
            if let Some(name) = &provider_season.name {
                local.name = name.clone();
            }
            local.air_date = provider_season.air_date.clone();
            local.poster_path = provider_season.poster_path.clone();

            let season_details = match self
                .provider
                .season_details(details.id, provider_season.season_number)
                .await
            {
                Ok(season_details) => season_details,
                Err(e) => {
                    warn!(
                        season = provider_season.season_number,
                        error = %e,
                        "failed to fetch season details"
                    );
                    continue;
                }
            };

            for provider_episode in &season_details.episodes {
                let local_episode = match local
                    .episodes
                    .iter_mut()
                    .find(|e| e.number == provider_episode.episode_number)
                {
                    Some(episode) => episode,
                    None => continue,
                };

                local_episode.provider_id = Some(provider_episode.provider_id);
                local_episode.name = provider_episode.name.clone();
                local_episode.air_date = provider_episode.air_date.clone();
                local_episode.still_path = provider_episode.still_path.clone();
                local_episode.overview = provider_episode.overview.clone();
                local_episode.vote_average = provider_episode.vote_average;
                local_episode.vote_count = provider_episode.vote_count;
            }
        }
    }
}

/// First discovered filename of a series, the year-hint source.
fn first_series_file_name(series: &Series) -> Option<String> {
    series
        .seasons
        .first()?
        .episodes
        .first()?
        .sources
        .first()?
        .files
        .first()
        .map(|f| f.name.clone())
}

fn movie_candidate(summary: &MovieSummary) -> MatchCandidate {
    MatchCandidate {
        provider_id: summary.id,
        title: summary.title.clone(),
        year: summary.year(),
        popularity: summary.popularity,
    }
}

fn series_candidate(summary: &SeriesSummary) -> MatchCandidate {
    MatchCandidate {
        provider_id: summary.id,
        title: summary.name.clone(),
        year: summary.year(),
        popularity: summary.popularity,
    }
}

fn genre(g: &ProviderGenre) -> Genre {
    Genre {
        id: g.id,
        name: g.name.clone(),
    }
}

fn cast_member(c: &ProviderCast) -> CastMember {
    CastMember {
        id: c.id,
        name: c.name.clone(),
        character: c.character.clone(),
        profile_path: c.profile_path.clone(),
    }
}

fn crew_member(c: &ProviderCrew) -> CrewMember {
    CrewMember {
        id: c.id,
        name: c.name.clone(),
        department: c.department.clone(),
        job: c.job.clone(),
        profile_path: c.profile_path.clone(),
    }
}

/// Keep only promotional videos hosted on the official platform.
fn is_promo_video(v: &ProviderVideo) -> bool {
    v.site == "YouTube" && (v.video_type == "Trailer" || v.video_type == "Teaser")
}

fn video_clip(v: &ProviderVideo) -> VideoClip {
    VideoClip {
        id: v.id.clone(),
        key: v.key.clone(),
        name: v.name.clone(),
        site: v.site.clone(),
        video_type: v.video_type.clone(),
        official: v.official,
    }
}

/// Merge movie details into the local record. Files are never touched.
fn apply_movie_details(movie: &mut Movie, details: &MovieDetails) {
    if let Some(overview) = details.overview.as_deref().filter(|o| !o.is_empty()) {
        movie.description = overview.to_string();
    }

    movie.metadata = Some(MovieMetadata {
        provider_id: details.id,
        imdb_id: details.imdb_id.clone(),
        poster_path: details.poster_path.clone(),
        backdrop_path: details.backdrop_path.clone(),
        release_date: details.release_date.clone(),
        runtime_minutes: details.runtime_minutes,
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        popularity: details.popularity,
        genres: details.genres.iter().map(genre).collect(),
        cast: details.cast.iter().take(MAX_CAST).map(cast_member).collect(),
        crew: details
            .crew
            .iter()
            .filter(|c| MOVIE_CREW_JOBS.contains(&c.job.as_str()))
            .map(crew_member)
            .collect(),
        videos: details
            .videos
            .iter()
            .filter(|v| is_promo_video(v))
            .map(video_clip)
            .collect(),
        last_synced_at: Utc::now(),
    });
}

/// Merge series details into the local record. Seasons are handled
/// separately by `reconcile_seasons`.
fn apply_series_details(series: &mut Series, details: &SeriesDetails) {
    if let Some(overview) = details.overview.as_deref().filter(|o| !o.is_empty()) {
        series.description = overview.to_string();
    }

    series.metadata = Some(SeriesMetadata {
        provider_id: details.id,
        poster_path: details.poster_path.clone(),
        backdrop_path: details.backdrop_path.clone(),
        first_air_date: details.first_air_date.clone(),
        last_air_date: details.last_air_date.clone(),
        status: details.status.clone(),
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        popularity: details.popularity,
        number_of_seasons: details.number_of_seasons,
        number_of_episodes: details.number_of_episodes,
        genres: details.genres.iter().map(genre).collect(),
        networks: details
            .networks
            .iter()
            .map(|n| Network {
                id: n.id,
                name: n.name.clone(),
                logo_path: n.logo_path.clone(),
                origin_country: n.origin_country.clone(),
            })
            .collect(),
        cast: details.cast.iter().take(MAX_CAST).map(cast_member).collect(),
        crew: details
            .crew
            .iter()
            .filter(|c| SERIES_CREW_JOBS.contains(&c.job.as_str()))
            .map(crew_member)
            .collect(),
        videos: details
            .videos
            .iter()
            .filter(|v| is_promo_video(v))
            .map(video_clip)
            .collect(),
        last_synced_at: Utc::now(),
    });
}
