//! End-to-end reconciliation flow: extraction output → checkpoint
//! artifacts → store → sync against a mock provider.

use std::sync::Arc;

use cinedex_core::catalog::{CatalogQuery, CatalogStore, MemoryCatalog, Title, TitleKind};
use cinedex_core::crawler::extract::{build_episodes, minimal_file};
use cinedex_core::crawler::{CheckpointConfig, CheckpointStore, RawFileEntry};
use cinedex_core::reconcile::{MatcherConfig, SyncConfig, SyncService};
use cinedex_core::testing::{fixtures, MockMetadataProvider};
use chrono::Utc;
use tempfile::TempDir;

const MB: u64 = 1024 * 1024;

fn raw(fid: u64, name: &str, mb: u64) -> RawFileEntry {
    RawFileEntry {
        file_id: fid,
        name: name.to_string(),
        size: format!("{} MB", mb),
        size_bytes: mb * MB,
        thumbnail: None,
    }
}

fn fast_sync(provider: Arc<MockMetadataProvider>, store: Arc<MemoryCatalog>) -> SyncService {
    SyncService::new(
        provider,
        store,
        MatcherConfig::default(),
        SyncConfig {
            pacing_ms: 1,
            page_size: 50,
        },
    )
}

#[tokio::test]
async fn extracted_series_round_trips_and_gets_enriched() {
    // Extraction: flat listing → grouped tree
    let entries = vec![
        raw(11, "The.Show.S01E01.1080p.x264.mp4", 300),
        raw(12, "The.Show.S01E01.720p.x265.mp4", 200),
        raw(13, "The.Show.S01E02.1080p.x264.mp4", 400),
        raw(14, "The.Show.Extras.Interview.mp4", 50),
    ];
    let enriched: Vec<_> = entries.iter().map(minimal_file).collect();
    let episodes = build_episodes(&entries, &enriched);

    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].sources.len(), 2);
    assert_eq!(episodes[0].size_mb, 500);

    let mut series = fixtures::local_series("tv9", "The Show", &[]);
    series.seasons.push(cinedex_core::catalog::Season {
        season_id: "season_1".to_string(),
        name: "Season 1".to_string(),
        number: 1,
        size_mb: episodes.iter().map(|e| e.size_mb).sum(),
        episodes,
        provider_id: None,
        air_date: None,
        poster_path: None,
    });

    // Checkpoint round trip
    let dir = TempDir::new().unwrap();
    let checkpoints = CheckpointStore::new(&CheckpointConfig {
        temp_dir: dir.path().join("temp"),
        data_dir: dir.path().to_path_buf(),
    });
    checkpoints
        .save_snapshot(TitleKind::Series, &[Title::Series(series)])
        .unwrap();
    checkpoints.merge(TitleKind::Series).unwrap();
    let loaded = checkpoints.load_canonical(TitleKind::Series).unwrap();
    assert_eq!(loaded.len(), 1);

    // Seed the store and reconcile against the mock provider
    let store = Arc::new(MemoryCatalog::new());
    for title in &loaded {
        assert!(store.insert_if_absent(title).unwrap());
    }

    let provider = Arc::new(MockMetadataProvider::new());
    provider
        .set_series_results(vec![fixtures::series_summary(500, "The Show", Some(2008), 30.0)])
        .await;
    provider
        .add_series(fixtures::series_details(500, "The Show", 2008, &[1, 2]))
        .await;
    provider
        .add_season(500, fixtures::season_details(500, 1, 5))
        .await;
    provider
        .add_season(500, fixtures::season_details(500, 2, 5))
        .await;

    let service = fast_sync(Arc::clone(&provider), Arc::clone(&store));
    let report = service.sync_all_series().await.unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(report.failed, 0);

    // The stored record carries metadata; its file tree is intact
    let stored = store
        .find_by_key(TitleKind::Series, "tv9")
        .unwrap()
        .expect("series still stored");
    let Title::Series(stored) = stored else {
        panic!("expected a series");
    };

    let metadata = stored.metadata.as_ref().expect("metadata merged");
    assert_eq!(metadata.provider_id, 500);
    assert_eq!(metadata.number_of_seasons, 2);

    assert_eq!(stored.seasons.len(), 1, "no season fabricated");
    let season = &stored.seasons[0];
    assert_eq!(season.episodes.len(), 2, "no episode fabricated");
    assert_eq!(season.episodes[0].name, "Provider Episode 1");
    // Discovered sources and sizes untouched
    assert_eq!(season.episodes[0].sources.len(), 2);
    assert_eq!(season.size_mb, 900);
}

#[tokio::test]
async fn enriched_catalog_is_searchable_by_text() {
    let store = Arc::new(MemoryCatalog::new());
    store
        .insert_if_absent(&fixtures::movie_title("m1", "Alpha", "Alpha.2020.mp4"))
        .unwrap();

    let provider = Arc::new(MockMetadataProvider::new());
    provider
        .set_movie_results(vec![fixtures::movie_summary(10, "Alpha", Some(2020), 5.0)])
        .await;
    provider.add_movie(fixtures::movie_details(10, "Alpha", 2020)).await;

    let service = fast_sync(Arc::clone(&provider), Arc::clone(&store));
    service.sync_all_movies().await.unwrap();

    // Reconciliation rewrote the description from the provider overview,
    // and text search finds it
    let hits = store
        .find(&CatalogQuery::new().with_text("overview"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].local_id(), "m1");
}

#[tokio::test]
async fn resync_uses_stored_provider_id() {
    let store = Arc::new(MemoryCatalog::new());
    store
        .insert_if_absent(&fixtures::movie_title("m1", "Alpha", "Alpha.2020.mp4"))
        .unwrap();

    let provider = Arc::new(MockMetadataProvider::new());
    provider
        .set_movie_results(vec![fixtures::movie_summary(10, "Alpha", Some(2020), 5.0)])
        .await;
    provider.add_movie(fixtures::movie_details(10, "Alpha", 2020)).await;

    let service = fast_sync(Arc::clone(&provider), Arc::clone(&store));
    service.sync_all_movies().await.unwrap();

    // Second pass: the stored provider ID short-circuits to details
    let service = fast_sync(Arc::clone(&provider), Arc::clone(&store));
    let report = service.sync_all_movies().await.unwrap();
    assert_eq!(report.matched, 1);

    let searches = provider
        .recorded_queries()
        .await
        .iter()
        .filter(|q| {
            matches!(
                q,
                cinedex_core::testing::RecordedQuery::SearchMovies { .. }
            )
        })
        .count();
    assert_eq!(searches, 1, "only the first pass searches");
}

#[tokio::test]
async fn no_match_titles_stay_unenriched_and_counted() {
    let store = Arc::new(MemoryCatalog::new());
    store
        .insert_if_absent(&fixtures::movie_title(
            "m1",
            "Obscure Local Thing",
            "Obscure.mp4",
        ))
        .unwrap();

    let provider = Arc::new(MockMetadataProvider::new());

    let service = fast_sync(Arc::clone(&provider), Arc::clone(&store));
    let report = service.sync_all_movies().await.unwrap();

    assert_eq!(report.no_match, 1);
    assert_eq!(report.matched, 0);

    let stored = store.find_by_key(TitleKind::Movie, "m1").unwrap().unwrap();
    assert!(stored.provider_id().is_none());
    // scraped_at fixture date preserved, nothing else was touched
    let Title::Movie(movie) = stored else { panic!() };
    assert!(movie.scraped_at < Utc::now());
}
