pub mod catalog;
pub mod config;
pub mod crawler;
pub mod metadata;
pub mod reconcile;
pub mod testing;

pub use catalog::{CatalogError, CatalogQuery, CatalogStore, MemoryCatalog, Title, TitleKind};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use crawler::{
    CheckpointStore, Crawler, FetchError, FileHostClient, Frontier, IndexSiteClient, RunSummary,
    WorkerPool,
};
pub use metadata::{MetadataError, MetadataProvider, TmdbClient, TmdbConfig};
pub use reconcile::{MatcherConfig, SyncConfig, SyncReport, SyncService};
