//! File host client.
//!
//! The host exposes a share link per title; behind it sit folder listings
//! (seasons), flat file listings, per-file detail lookups and a quality
//! list endpoint whose payload is an HTML fragment. All endpoints are
//! routed through the configured proxy.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::FetchError;
use super::pool::RetryPolicy;
use crate::catalog::{StreamLink, TitleKind};

/// File host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHostConfig {
    /// Host base URL (file listings, file info, quality lists).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Index site base URL carrying the share-link resolution endpoint.
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,

    /// Proxy prefix every request is routed through.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Session cookie for authenticated host endpoints.
    #[serde(default)]
    pub cookie: String,

    /// Concurrency of the per-file enrichment fan-out.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Retry attempts for enrichment fetches.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base enrichment backoff delay (milliseconds).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://www.febbox.com".to_string()
}

fn default_share_base_url() -> String {
    "http://156.242.65.27".to_string()
}

fn default_proxy_url() -> String {
    "https://simple-proxy-2.xartpvt.workers.dev?destination=".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_enrich_concurrency() -> usize {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FileHostConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            share_base_url: default_share_base_url(),
            proxy_url: default_proxy_url(),
            user_agent: default_user_agent(),
            cookie: String::new(),
            enrich_concurrency: default_enrich_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            http_timeout_secs: default_timeout_secs(),
        }
    }
}

impl FileHostConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// A raw file descriptor from the host's listing endpoint.
#[derive(Debug, Clone)]
pub struct RawFileEntry {
    pub file_id: u64,
    pub name: String,
    /// Display size string as the host renders it.
    pub size: String,
    pub size_bytes: u64,
    pub thumbnail: Option<String>,
}

/// Per-file detail record.
#[derive(Debug, Clone)]
pub struct FileDetails {
    pub file_id: u64,
    pub name: String,
    pub size: String,
    pub thumbnail: Option<String>,
}

/// A season folder on a series share page.
#[derive(Debug, Clone)]
pub struct SeasonFolder {
    pub parent_id: String,
    pub name: String,
}

/// Extract the share key from a resolved share link (its last path segment).
pub fn share_key_from_link(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// HTTP client for the file host.
pub struct FileHostClient {
    client: Client,
    config: FileHostConfig,
}

impl FileHostClient {
    pub fn new(config: FileHostConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| FetchError::Fatal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FileHostConfig {
        &self.config
    }

    /// Route a URL through the proxy, query-escaped.
    fn proxied(&self, url: &str) -> String {
        format!("{}{}", self.config.proxy_url, urlencoding::encode(url))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        with_cookie: bool,
    ) -> Result<T, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent);
        if with_cookie && !self.config.cookie.is_empty() {
            request = request.header("Cookie", &self.config.cookie);
        }

        let response = request.send().await?;
        if let Some(err) = FetchError::classify_status(response.status()) {
            return Err(err);
        }

        Ok(response.json::<T>().await?)
    }

    /// Resolve a title's share link from its index-site content ID.
    pub async fn resolve_share_link(
        &self,
        content_id: &str,
        kind: TitleKind,
    ) -> Result<String, FetchError> {
        let content_type = match kind {
            TitleKind::Movie => 1,
            TitleKind::Series => 2,
        };
        let target = format!(
            "{}/index/share_link?id={}&type={}",
            self.config.share_base_url, content_id, content_type
        );
        let url = self.proxied(&target);

        debug!(content_id, content_type, "resolving share link");

        let payload: ShareLinkResponse = self.get_json(&url, false).await?;
        if payload.data.link.is_empty() {
            return Err(FetchError::Fatal(format!(
                "empty share link for content {}",
                content_id
            )));
        }

        Ok(payload.data.link)
    }

    /// Fetch the share page HTML (season folders live here for series).
    pub async fn fetch_share_page(&self, link: &str) -> Result<String, FetchError> {
        let url = self.proxied(link);
        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", &self.config.user_agent);
        if !self.config.cookie.is_empty() {
            request = request.header("Cookie", &self.config.cookie);
        }

        let response = request.send().await?;
        if let Some(err) = FetchError::classify_status(response.status()) {
            return Err(err);
        }

        Ok(response.text().await?)
    }

    /// Parse season folders from a series share page.
    pub fn parse_season_folders(html: &str) -> Vec<SeasonFolder> {
        let doc = Html::parse_document(html);
        let folder_sel =
            Selector::parse(".f_list_scroll div[data-id]").expect("invalid folder selector");
        let name_sel = Selector::parse("p.file_name").expect("invalid name selector");

        doc.select(&folder_sel)
            .filter_map(|el| {
                let parent_id = el.value().attr("data-id")?.to_string();
                let name = el
                    .select(&name_sel)
                    .next()
                    .map(|n| n.text().collect::<String>().trim().to_string())
                    .unwrap_or_default();
                Some(SeasonFolder { parent_id, name })
            })
            .collect()
    }

    /// List files under a share key, optionally inside one folder.
    pub async fn list_files(
        &self,
        share_key: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<RawFileEntry>, FetchError> {
        let url = format!(
            "{}/file/file_share_list?share_key={}&pwd=&parent_id={}&is_html=0",
            self.config.base_url,
            share_key,
            parent_id.unwrap_or("")
        );

        debug!(share_key, parent_id = parent_id.unwrap_or(""), "listing shared files");

        let payload: FileListResponse = self.get_json(&url, true).await?;
        if payload.code != 1 {
            return Err(FetchError::Fatal(format!(
                "host API error: {} (code: {})",
                payload.msg, payload.code
            )));
        }

        Ok(payload
            .data
            .file_list
            .into_iter()
            .map(RawFileEntry::from)
            .collect())
    }

    /// Fetch detail fields for one file.
    pub async fn file_details(&self, file_id: u64) -> Result<FileDetails, FetchError> {
        let url = format!("{}/file/file_info?fid={}", self.config.base_url, file_id);

        let payload: FileInfoResponse = self.get_json(&url, true).await?;
        if payload.data.file.fid == 0 {
            return Err(FetchError::Fatal(format!(
                "invalid or empty file data for fid {}",
                file_id
            )));
        }

        Ok(payload.data.file.into())
    }

    /// Resolve the per-quality stream links of one file.
    ///
    /// The endpoint returns JSON wrapping an HTML fragment.
    pub async fn quality_links(&self, file_id: u64) -> Result<Vec<StreamLink>, FetchError> {
        let target = format!(
            "{}/console/video_quality_list?fid={}&type=1",
            self.config.base_url, file_id
        );
        let url = self.proxied(&target);

        let payload: QualityListResponse = self.get_json(&url, true).await?;
        let html = payload
            .html
            .ok_or_else(|| FetchError::Fatal("quality list response missing html".to_string()))?;

        Ok(Self::parse_quality_fragment(&html))
    }

    /// Parse the quality-list HTML fragment into stream links.
    pub fn parse_quality_fragment(html: &str) -> Vec<StreamLink> {
        let doc = Html::parse_fragment(html);
        let quality_sel = Selector::parse(".file_quality").expect("invalid quality selector");
        let size_sel = Selector::parse(".desc .size").expect("invalid size selector");

        doc.select(&quality_sel)
            .map(|el| StreamLink {
                quality: el.value().attr("data-quality").unwrap_or("").to_string(),
                url: el.value().attr("data-url").unwrap_or("").to_string(),
                size: el
                    .select(&size_sel)
                    .next()
                    .map(|s| s.text().collect::<String>().trim().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

// ============================================================================
// Host API response types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ShareLinkResponse {
    data: ShareLinkData,
}

#[derive(Debug, Deserialize)]
struct ShareLinkData {
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    code: i32,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: FileListData,
}

#[derive(Debug, Default, Deserialize)]
struct FileListData {
    #[serde(default)]
    file_list: Vec<SharedFile>,
}

#[derive(Debug, Deserialize)]
struct SharedFile {
    fid: u64,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    file_size: String,
    #[serde(default)]
    file_size_bytes: u64,
    #[serde(default)]
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfoResponse {
    data: FileInfoData,
}

#[derive(Debug, Deserialize)]
struct FileInfoData {
    file: FileInfo,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    fid: u64,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    thumb_big: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QualityListResponse {
    #[serde(default)]
    html: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<SharedFile> for RawFileEntry {
    fn from(f: SharedFile) -> Self {
        Self {
            file_id: f.fid,
            name: f.file_name,
            size: f.file_size,
            size_bytes: f.file_size_bytes,
            thumbnail: f.thumb.filter(|t| !t.is_empty()),
        }
    }
}

impl From<FileInfo> for FileDetails {
    fn from(f: FileInfo) -> Self {
        Self {
            file_id: f.fid,
            name: f.file_name,
            size: f.size,
            thumbnail: f.thumb_big.filter(|t| !t.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_key_from_link() {
        assert_eq!(
            share_key_from_link("https://host.example/share/AbC123xYz"),
            "AbC123xYz"
        );
        assert_eq!(share_key_from_link("no-slashes"), "no-slashes");
    }

    #[test]
    fn test_parse_quality_fragment() {
        let html = r#"
            <div class="file_quality" data-quality="1080p" data-url="https://cdn.example/v1">
                <div class="desc"><span class="size">2.1 GB</span></div>
            </div>
            <div class="file_quality" data-quality="720p" data-url="https://cdn.example/v2">
                <div class="desc"><span class="size">1.1 GB</span></div>
            </div>
        "#;

        let links = FileHostClient::parse_quality_fragment(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].quality, "1080p");
        assert_eq!(links[0].url, "https://cdn.example/v1");
        assert_eq!(links[0].size, "2.1 GB");
        assert_eq!(links[1].quality, "720p");
    }

    #[test]
    fn test_parse_season_folders() {
        let html = r#"
            <div class="f_list_scroll">
                <div data-id="111"><p class="file_name">Season 1</p></div>
                <div data-id="222"><p class="file_name">Season 2</p></div>
                <div><p class="file_name">no id, skipped</p></div>
            </div>
        "#;

        let folders = FileHostClient::parse_season_folders(html);
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].parent_id, "111");
        assert_eq!(folders[0].name, "Season 1");
        assert_eq!(folders[1].parent_id, "222");
    }

    #[test]
    fn test_shared_file_conversion() {
        let json = r#"{
            "fid": 42,
            "file_name": "Show.S01E01.1080p.x264.mp4",
            "file_size": "1.4 GB",
            "file_size_bytes": 1503238553,
            "thumb": "https://cdn.example/t.jpg"
        }"#;
        let shared: SharedFile = serde_json::from_str(json).unwrap();
        let entry: RawFileEntry = shared.into();

        assert_eq!(entry.file_id, 42);
        assert_eq!(entry.name, "Show.S01E01.1080p.x264.mp4");
        assert_eq!(entry.size_bytes, 1503238553);
        assert_eq!(entry.thumbnail.as_deref(), Some("https://cdn.example/t.jpg"));
    }

    #[test]
    fn test_file_list_response_parses_without_optional_fields() {
        let json = r#"{"code": 1, "data": {"file_list": [{"fid": 7}]}}"#;
        let payload: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.code, 1);
        assert_eq!(payload.data.file_list.len(), 1);
        assert_eq!(payload.data.file_list[0].fid, 7);
    }

    #[test]
    fn test_proxied_urls_are_escaped() {
        let client = FileHostClient::new(FileHostConfig::default()).unwrap();
        let url = client.proxied("https://host.example/a?b=c&d=e");
        assert!(url.starts_with(&FileHostConfig::default().proxy_url));
        assert!(!url[FileHostConfig::default().proxy_url.len()..].contains('&'));
    }
}
