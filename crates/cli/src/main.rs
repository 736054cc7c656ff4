use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinedex_core::{
    load_config, validate_config, CatalogQuery, CatalogStore, CheckpointStore, Config, Crawler,
    FileHostClient, IndexSiteClient, MemoryCatalog, MetadataProvider, SyncService, TitleKind,
    TmdbClient, WorkerPool,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mode = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "crawl-movies".to_string());

    // Determine config path
    let config_path = std::env::var("CINEDEX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("cinedex.toml"));

    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };

    validate_config(&config).context("Configuration validation failed")?;

    match mode.as_str() {
        "crawl-movies" => crawl(config, TitleKind::Movie).await,
        "crawl-series" => crawl(config, TitleKind::Series).await,
        "sync" => sync(config).await,
        other => bail!(
            "unknown mode '{}' (expected crawl-movies, crawl-series or sync)",
            other
        ),
    }
}

async fn crawl(config: Config, kind: TitleKind) -> Result<()> {
    let index = Arc::new(IndexSiteClient::new(config.index_site)?);
    let host = Arc::new(FileHostClient::new(config.file_host)?);
    let pool = WorkerPool::new(config.pool);
    let checkpoints = Arc::new(CheckpointStore::new(&config.checkpoint));

    let crawler = Crawler::new(kind, config.crawl, index, host, pool, checkpoints);

    // An interrupt stops admission; in-flight work drains and the run
    // still checkpoints and merges.
    let shutdown = crawler.shutdown_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight work");
            let _ = shutdown.send(());
        }
    });

    let summary = crawler.run().await;
    info!(
        discovered = summary.discovered,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        no_files = summary.no_files,
        "Crawl complete"
    );

    Ok(())
}

async fn sync(config: Config) -> Result<()> {
    let tmdb_config = config
        .metadata
        .context("sync requires a [metadata] section with an api_key")?;
    let provider: Arc<dyn MetadataProvider> = Arc::new(TmdbClient::new(tmdb_config)?);
    let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalog::new());
    let checkpoints = CheckpointStore::new(&config.checkpoint);

    // Seed the store from the canonical crawl artifacts
    for kind in [TitleKind::Movie, TitleKind::Series] {
        let titles = checkpoints
            .load_canonical(kind)
            .with_context(|| format!("failed to load {} catalog", kind.artifact_prefix()))?;
        info!(
            kind = kind.artifact_prefix(),
            count = titles.len(),
            "Loaded canonical catalog"
        );
        for title in &titles {
            store
                .insert_if_absent(title)
                .context("failed to seed catalog store")?;
        }
    }

    let service = SyncService::new(provider, Arc::clone(&store), config.matcher, config.sync);

    let movie_report = service.sync_all_movies().await?;
    let series_report = service.sync_all_series().await?;

    info!(
        movies_matched = movie_report.matched,
        movies_no_match = movie_report.no_match,
        movies_failed = movie_report.failed,
        series_matched = series_report.matched,
        series_no_match = series_report.no_match,
        series_failed = series_report.failed,
        "Sync complete"
    );

    // Write the enriched catalog back through the artifact family
    for kind in [TitleKind::Movie, TitleKind::Series] {
        let titles = store
            .find(&CatalogQuery::new().with_kind(kind))
            .context("failed to read back enriched titles")?;
        if titles.is_empty() {
            continue;
        }
        checkpoints
            .save_snapshot(kind, &titles)
            .with_context(|| format!("failed to snapshot {}", kind.artifact_prefix()))?;
        checkpoints
            .merge(kind)
            .with_context(|| format!("failed to merge {}", kind.artifact_prefix()))?;
    }

    Ok(())
}
