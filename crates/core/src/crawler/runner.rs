//! Crawl runner.
//!
//! Drives the pipeline: listing pages → detail pages → share-link
//! resolution → file listings → extraction, with frontier dedup at every
//! fetch boundary, periodic checkpoints of the accumulation buffer and a
//! final idempotent merge. An interrupt stops admission, drains in-flight
//! work and still checkpoints and merges before returning.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::checkpoint::CheckpointStore;
use super::error::FetchError;
use super::extract;
use super::file_host::{share_key_from_link, FileHostClient};
use super::frontier::Frontier;
use super::index_site::{DiscoveredTitle, IndexSiteClient};
use super::pool::{PoolSummary, WorkerPool};
use crate::catalog::{Movie, Season, Series, Title, TitleKind};

/// Crawl window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    #[serde(default = "default_end_page")]
    pub end_page: u32,

    /// Snapshot the buffer every this many completed titles.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> u32 {
    10
}

fn default_checkpoint_every() -> usize {
    5
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_page: default_start_page(),
            end_page: default_end_page(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

/// End-of-run accounting.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Titles discovered on listing pages.
    pub discovered: usize,
    /// Titles extracted and buffered for persistence.
    pub succeeded: usize,
    /// Units that failed (retries exhausted or fatal).
    pub failed: usize,
    /// Units skipped: frontier duplicates plus shutdown-unadmitted.
    pub skipped: usize,
    /// Titles reached but yielding no usable files.
    pub no_files: usize,
}

/// Shared mutable crawl state: counters plus the title accumulation buffer.
#[derive(Default)]
struct CrawlState {
    buffer: RwLock<Vec<Title>>,
    appended: AtomicUsize,
    no_files: AtomicUsize,
    completed: AtomicUsize,
}

/// The crawl pipeline for one title kind.
pub struct Crawler {
    kind: TitleKind,
    config: CrawlConfig,
    index: Arc<IndexSiteClient>,
    host: Arc<FileHostClient>,
    pool: WorkerPool,
    frontier: Arc<Frontier>,
    checkpoints: Arc<CheckpointStore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Crawler {
    pub fn new(
        kind: TitleKind,
        config: CrawlConfig,
        index: Arc<IndexSiteClient>,
        host: Arc<FileHostClient>,
        pool: WorkerPool,
        checkpoints: Arc<CheckpointStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            kind,
            config,
            index,
            host,
            pool,
            frontier: Arc::new(Frontier::new()),
            checkpoints,
            shutdown_tx,
        }
    }

    /// Handle for requesting a graceful shutdown (e.g. from a signal task).
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Keep only units whose frontier key is newly marked.
    ///
    /// Marking happens before pool admission so task retries stay
    /// idempotent: a retried task never re-checks its own mark.
    fn admit_units<T>(&self, units: Vec<(String, T)>, dedup_skipped: &mut usize) -> Vec<T> {
        let mut admitted = Vec::with_capacity(units.len());
        for (key, unit) in units {
            if self.frontier.mark_if_absent(&key) {
                admitted.push(unit);
            } else {
                debug!(key = %key, "duplicate discovery key, skipping");
                *dedup_skipped += 1;
            }
        }
        admitted
    }

    /// Run the crawl to completion or interrupt, then merge checkpoints.
    pub async fn run(&self) -> RunSummary {
        let state = Arc::new(CrawlState::default());
        let mut dedup_skipped = 0usize;

        info!(
            kind = self.kind.artifact_prefix(),
            start_page = self.config.start_page,
            end_page = self.config.end_page,
            "starting crawl"
        );

        // Phase 1: listing pages → detail paths
        let pages: Vec<(String, u32)> = (self.config.start_page..=self.config.end_page)
            .map(|page| (self.index.listing_url(self.kind, page), page))
            .collect();
        let pages = self.admit_units(pages, &mut dedup_skipped);
        let (paths, pages_summary) = self.discover_paths(pages).await;

        // Phase 2: detail pages → discovered titles
        let paths: Vec<(String, String)> = paths
            .into_iter()
            .map(|path| (self.index.detail_url(&path), path))
            .collect();
        let paths = self.admit_units(paths, &mut dedup_skipped);
        let (discovered, details_summary) = self.fetch_details(paths).await;
        let discovered_count = discovered.len();

        // Phase 3: titles → extracted subtrees in the buffer
        let titles: Vec<(String, DiscoveredTitle)> = discovered
            .into_iter()
            .map(|t| (format!("{}:{}", self.kind.artifact_prefix(), t.local_id), t))
            .collect();
        let titles = self.admit_units(titles, &mut dedup_skipped);
        let titles_summary = self.extract_titles(titles, &state).await;

        // Always checkpoint and merge, interrupted or not
        self.snapshot(&state);
        match self.checkpoints.merge(self.kind) {
            Ok(report) => info!(
                unique = report.unique_titles,
                snapshots = report.snapshots_merged,
                "final merge complete"
            ),
            Err(e) => warn!(error = %e, "final merge failed"),
        }

        let mut pool_totals = PoolSummary::default();
        pool_totals.merge(&pages_summary);
        pool_totals.merge(&details_summary);
        pool_totals.merge(&titles_summary);

        let summary = RunSummary {
            discovered: discovered_count,
            succeeded: state.appended.load(Ordering::SeqCst),
            failed: pool_totals.failed + pool_totals.abandoned,
            skipped: pool_totals.skipped + dedup_skipped,
            no_files: state.no_files.load(Ordering::SeqCst),
        };

        info!(
            discovered = summary.discovered,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            no_files = summary.no_files,
            "crawl finished"
        );

        summary
    }

    /// Fetch every listing page in the window, collecting detail paths.
    async fn discover_paths(&self, pages: Vec<u32>) -> (Vec<String>, PoolSummary) {
        let found: Arc<RwLock<Vec<String>>> = Arc::new(RwLock::new(Vec::new()));

        let kind = self.kind;
        let index = Arc::clone(&self.index);
        let found_ref = Arc::clone(&found);

        let summary = self
            .pool
            .run(pages, self.shutdown_tx.subscribe(), move |page| {
                let index = Arc::clone(&index);
                let found = Arc::clone(&found_ref);
                async move {
                    let paths = index.fetch_listing(kind, page).await?;
                    debug!(page, titles = paths.len(), "listing page processed");
                    found.write().expect("paths lock poisoned").extend(paths);
                    Ok(())
                }
            })
            .await;

        let mut paths = Arc::try_unwrap(found)
            .map(|lock| lock.into_inner().expect("paths lock poisoned"))
            .unwrap_or_default();
        // Listing pages complete in any order
        paths.sort();
        paths.dedup();

        (paths, summary)
    }

    /// Fetch every discovered detail page into a `DiscoveredTitle`.
    async fn fetch_details(
        &self,
        paths: Vec<String>,
    ) -> (Vec<DiscoveredTitle>, PoolSummary) {
        let found: Arc<RwLock<Vec<DiscoveredTitle>>> = Arc::new(RwLock::new(Vec::new()));

        let kind = self.kind;
        let index = Arc::clone(&self.index);
        let found_ref = Arc::clone(&found);

        let summary = self
            .pool
            .run(paths, self.shutdown_tx.subscribe(), move |path: String| {
                let index = Arc::clone(&index);
                let found = Arc::clone(&found_ref);
                async move {
                    let title = index.fetch_detail(&path, kind).await?;
                    debug!(id = %title.local_id, title = %title.title, "title discovered");
                    found.write().expect("titles lock poisoned").push(title);
                    Ok(())
                }
            })
            .await;

        let mut titles = Arc::try_unwrap(found)
            .map(|lock| lock.into_inner().expect("titles lock poisoned"))
            .unwrap_or_default();
        titles.sort_by(|a, b| a.local_id.cmp(&b.local_id));

        (titles, summary)
    }

    /// Resolve, list and extract every discovered title into the buffer.
    async fn extract_titles(
        &self,
        discovered: Vec<DiscoveredTitle>,
        state: &Arc<CrawlState>,
    ) -> PoolSummary {
        let kind = self.kind;
        let checkpoint_every = self.config.checkpoint_every.max(1);
        let host = Arc::clone(&self.host);
        let frontier = Arc::clone(&self.frontier);
        let checkpoints = Arc::clone(&self.checkpoints);
        let state_ref = Arc::clone(state);

        self.pool
            .run(
                discovered,
                self.shutdown_tx.subscribe(),
                move |title: DiscoveredTitle| {
                    let host = Arc::clone(&host);
                    let frontier = Arc::clone(&frontier);
                    let checkpoints = Arc::clone(&checkpoints);
                    let state = Arc::clone(&state_ref);
                    async move {
                        let link = host.resolve_share_link(&title.local_id, kind).await?;
                        if frontier.contains(&link) {
                            debug!(link = %link, "share link already visited");
                            return Ok(());
                        }

                        let built = match kind {
                            TitleKind::Movie => build_movie(&host, &title, &link).await?,
                            TitleKind::Series => build_series(&host, &title, &link).await?,
                        };

                        // Marked only after the work is done, so a retry of
                        // this unit is never mistaken for a duplicate
                        frontier.mark_if_absent(&link);

                        match built {
                            Some(t) => {
                                info!(id = %t.local_id(), title = %t.display_name(), "title extracted");
                                state
                                    .buffer
                                    .write()
                                    .expect("buffer lock poisoned")
                                    .push(t);
                                state.appended.fetch_add(1, Ordering::SeqCst);
                            }
                            None => {
                                warn!(id = %title.local_id, title = %title.title, "no usable files found");
                                state.no_files.fetch_add(1, Ordering::SeqCst);
                            }
                        }

                        let done = state.completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if done % checkpoint_every == 0 {
                            let titles = state
                                .buffer
                                .read()
                                .expect("buffer lock poisoned")
                                .clone();
                            if let Err(e) = checkpoints.save_snapshot(kind, &titles) {
                                warn!(error = %e, "checkpoint save failed");
                            }
                        }

                        Ok(())
                    }
                },
            )
            .await
    }

    /// Snapshot the current buffer, logging instead of failing.
    fn snapshot(&self, state: &Arc<CrawlState>) {
        let titles = state.buffer.read().expect("buffer lock poisoned").clone();
        if titles.is_empty() {
            return;
        }
        if let Err(e) = self.checkpoints.save_snapshot(self.kind, &titles) {
            warn!(error = %e, "final checkpoint save failed");
        }
    }
}

/// Build a movie title: the share root's files, enriched.
async fn build_movie(
    host: &FileHostClient,
    discovered: &DiscoveredTitle,
    link: &str,
) -> Result<Option<Title>, FetchError> {
    let share_key = share_key_from_link(link);
    let entries = host.list_files(share_key, None).await?;
    if entries.is_empty() {
        return Ok(None);
    }

    let files = extract::enrich_files(host, &entries).await;

    Ok(Some(Title::Movie(Movie {
        movie_id: discovered.local_id.clone(),
        title: discovered.title.clone(),
        description: discovered.description.clone(),
        details: discovered.details.clone(),
        files,
        metadata: None,
        scraped_at: Utc::now(),
    })))
}

/// Build a series title: one season per share-page folder, episodes from
/// the folder's file listing.
async fn build_series(
    host: &FileHostClient,
    discovered: &DiscoveredTitle,
    link: &str,
) -> Result<Option<Title>, FetchError> {
    let share_key = share_key_from_link(link);
    let page = host.fetch_share_page(link).await?;
    let folders = FileHostClient::parse_season_folders(&page);

    let mut seasons = Vec::new();
    for (idx, folder) in folders.iter().enumerate() {
        // Season number comes from folder position on the share page
        let number = (idx + 1) as u32;

        let entries = match host.list_files(share_key, Some(&folder.parent_id)).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    season = number,
                    error = %e,
                    "failed to list season folder, skipping"
                );
                continue;
            }
        };

        let enriched = extract::enrich_files(host, &entries).await;
        let episodes = extract::build_episodes(&entries, &enriched);
        if episodes.is_empty() {
            continue;
        }

        let size_mb = episodes.iter().map(|e| e.size_mb).sum();
        let name = if folder.name.is_empty() {
            format!("Season {}", number)
        } else {
            folder.name.clone()
        };

        debug!(season = number, episodes = episodes.len(), "season extracted");

        seasons.push(Season {
            season_id: format!("season_{}", number),
            name,
            number,
            size_mb,
            episodes,
            provider_id: None,
            air_date: None,
            poster_path: None,
        });
    }

    if seasons.is_empty() {
        return Ok(None);
    }

    Ok(Some(Title::Series(Series {
        series_id: discovered.local_id.clone(),
        title: discovered.title.clone(),
        description: discovered.description.clone(),
        details: discovered.details.clone(),
        seasons,
        metadata: None,
        scraped_at: Utc::now(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_config_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.start_page, 1);
        assert_eq!(config.end_page, 10);
        assert_eq!(config.checkpoint_every, 5);
    }

    #[test]
    fn test_crawl_config_deserialize_partial() {
        let config: CrawlConfig = toml::from_str("end_page = 3").unwrap();
        assert_eq!(config.start_page, 1);
        assert_eq!(config.end_page, 3);
        assert_eq!(config.checkpoint_every, 5);
    }

    #[test]
    fn test_run_summary_default() {
        let summary = RunSummary::default();
        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
    }
}
