use serde::{Deserialize, Serialize};

use crate::crawler::{CheckpointConfig, CrawlConfig, FileHostConfig, IndexSiteConfig, PoolConfig};
use crate::metadata::TmdbConfig;
use crate::reconcile::{MatcherConfig, SyncConfig};

/// Root configuration.
///
/// Every section is optional in the file; module defaults apply. The
/// metadata section is required only for reconciliation runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub index_site: IndexSiteConfig,

    #[serde(default)]
    pub file_host: FileHostConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TmdbConfig>,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            index_site: IndexSiteConfig::default(),
            file_host: FileHostConfig::default(),
            pool: PoolConfig::default(),
            checkpoint: CheckpointConfig::default(),
            metadata: None,
            matcher: MatcherConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}
