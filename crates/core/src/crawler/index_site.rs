//! Index site client.
//!
//! Discovery happens against the index site: paged listing pages yield
//! detail-page paths, detail pages yield the title's local ID, display
//! fields and free-text detail rows.

use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::FetchError;
use crate::catalog::{SiteDetails, TitleKind};

/// Index site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Proxy prefix every request is routed through.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://156.242.65.27".to_string()
}

fn default_proxy_url() -> String {
    "https://simple-proxy.xartpvt.workers.dev?destination=".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for IndexSiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            proxy_url: default_proxy_url(),
            user_agent: default_user_agent(),
            http_timeout_secs: default_timeout_secs(),
        }
    }
}

/// A title discovered on the index site, before file extraction.
#[derive(Debug, Clone)]
pub struct DiscoveredTitle {
    /// Site-assigned local ID.
    pub local_id: String,
    pub title: String,
    pub description: String,
    pub details: SiteDetails,
    pub kind: TitleKind,
}

/// HTTP client for the index site.
pub struct IndexSiteClient {
    client: Client,
    config: IndexSiteConfig,
}

impl IndexSiteClient {
    pub fn new(config: IndexSiteConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| FetchError::Fatal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Listing page URL for a kind and page number, routed through the proxy.
    pub fn listing_url(&self, kind: TitleKind, page: u32) -> String {
        let section = match kind {
            TitleKind::Movie => "movie",
            TitleKind::Series => "tv",
        };
        format!(
            "{}{}/{}?page={}",
            self.config.proxy_url, self.config.base_url, section, page
        )
    }

    /// Detail page URL for a site-relative path.
    pub fn detail_url(&self, path: &str) -> String {
        format!("{}{}{}", self.config.proxy_url, self.config.base_url, path)
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await?;

        if let Some(err) = FetchError::classify_status(response.status()) {
            return Err(err);
        }

        Ok(response.text().await?)
    }

    /// Fetch one listing page, returning the detail-page paths it links to.
    pub async fn fetch_listing(&self, kind: TitleKind, page: u32) -> Result<Vec<String>, FetchError> {
        let url = self.listing_url(kind, page);
        debug!(page, url = %url, "fetching listing page");

        let html = self.get_html(&url).await?;
        Ok(Self::parse_listing(&html))
    }

    /// Fetch and parse one detail page.
    pub async fn fetch_detail(&self, path: &str, kind: TitleKind) -> Result<DiscoveredTitle, FetchError> {
        let url = self.detail_url(path);
        debug!(path, "fetching detail page");

        let html = self.get_html(&url).await?;
        Self::parse_detail(&html, kind)
    }

    /// Extract detail-page paths from a listing page.
    ///
    /// Items inside "related titles" strips are skipped so pagination only
    /// ever yields the page's own listing.
    pub fn parse_listing(html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let item_sel =
            Selector::parse(".film_list-wrap .flw-item").expect("invalid listing selector");
        let link_sel =
            Selector::parse("div:nth-child(1) > a:nth-child(3)").expect("invalid link selector");

        doc.select(&item_sel)
            .filter(|item| !Self::inside_related(item))
            .filter_map(|item| {
                item.select(&link_sel)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .filter(|href| !href.is_empty())
                    .map(str::to_string)
            })
            .collect()
    }

    fn inside_related(el: &ElementRef) -> bool {
        el.ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().classes().any(|c| c == "film_related"))
    }

    /// Extract a `DiscoveredTitle` from a detail page.
    pub fn parse_detail(html: &str, kind: TitleKind) -> Result<DiscoveredTitle, FetchError> {
        let doc = Html::parse_document(html);
        let content_sel = Selector::parse(".dp-i-content").expect("invalid content selector");
        let heading_link_sel =
            Selector::parse(".heading-name a").expect("invalid heading selector");
        let heading_sel = Selector::parse(".heading-name").expect("invalid heading selector");
        let description_sel = Selector::parse(".description").expect("invalid description selector");
        let imdb_sel = Selector::parse(".btn-imdb").expect("invalid imdb selector");
        let row_sel = Selector::parse(".row-line").expect("invalid row selector");
        let label_sel = Selector::parse(".type").expect("invalid label selector");

        let content = doc
            .select(&content_sel)
            .next()
            .ok_or_else(|| FetchError::Fatal("detail page missing content block".to_string()))?;

        let link = content
            .select(&heading_link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| !href.is_empty())
            .ok_or_else(|| FetchError::Fatal("detail page missing title link".to_string()))?;

        let local_id = link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FetchError::Fatal(format!("unexpected title link format: {}", link)))?
            .to_string();

        let title = content
            .select(&heading_sel)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default();

        let description = content
            .select(&description_sel)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default();

        let imdb_rating = content
            .select(&imdb_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|text| {
                text.split_once(':')
                    .map(|(_, rating)| rating.trim().to_string())
            })
            .unwrap_or_default();

        let mut details = SiteDetails {
            imdb_rating,
            ..SiteDetails::default()
        };

        for row in content.select(&row_sel) {
            let label = row
                .select(&label_sel)
                .next()
                .map(|el| el.text().collect::<String>())
                .unwrap_or_default();
            let full = row.text().collect::<String>();
            let value = clean_text(&full.replacen(label.trim(), "", 1));
            let label = label.trim().to_lowercase();

            if label.contains("released") {
                details.release_date = value;
            } else if label.contains("genre") {
                details.genre = value;
            } else if label.contains("casts") {
                details.casts = value;
            } else if label.contains("duration") {
                details.duration = value;
            } else if label.contains("country") {
                details.country = value;
            } else if label.contains("production") {
                details.production = value;
            }
        }

        Ok(DiscoveredTitle {
            local_id,
            title,
            description,
            details,
            kind,
        })
    }
}

/// Collapse newlines and trim, as the site renders values across lines.
fn clean_text(text: &str) -> String {
    text.replace('\n', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <div class="dp-i-content">
            <h2 class="heading-name"><a href="/movie/watch-some-film-19771">Some Film</a></h2>
            <div class="description">
                A thing happens
                and then another.
            </div>
            <span class="btn-imdb">IMDB: 7.4</span>
            <div class="row-line"><span class="type">Released:</span> 1999-03-30</div>
            <div class="row-line"><span class="type">Genre:</span> Action, Sci-Fi</div>
            <div class="row-line"><span class="type">Casts:</span> A Person, B Person</div>
            <div class="row-line"><span class="type">Duration:</span> 136 min</div>
            <div class="row-line"><span class="type">Country:</span> United States</div>
            <div class="row-line"><span class="type">Production:</span> Big Studio</div>
        </div>
    "#;

    const LISTING_PAGE: &str = r#"
        <div class="film_list-wrap">
            <div class="flw-item">
                <div class="film-poster">
                    <img src="x.jpg">
                    <span></span>
                    <a href="/movie/watch-first-1111"></a>
                </div>
            </div>
            <div class="flw-item">
                <div class="film-poster">
                    <img src="y.jpg">
                    <span></span>
                    <a href="/movie/watch-second-2222"></a>
                </div>
            </div>
        </div>
        <div class="film_related">
            <div class="film_list-wrap">
                <div class="flw-item">
                    <div class="film-poster">
                        <img src="z.jpg">
                        <span></span>
                        <a href="/movie/watch-related-3333"></a>
                    </div>
                </div>
            </div>
        </div>
    "#;

    #[test]
    fn test_parse_listing_skips_related() {
        let paths = IndexSiteClient::parse_listing(LISTING_PAGE);
        assert_eq!(
            paths,
            vec!["/movie/watch-first-1111", "/movie/watch-second-2222"]
        );
    }

    #[test]
    fn test_parse_detail_fields() {
        let title = IndexSiteClient::parse_detail(DETAIL_PAGE, TitleKind::Movie).unwrap();

        assert_eq!(title.local_id, "watch-some-film-19771");
        assert_eq!(title.title, "Some Film");
        assert_eq!(title.description, "A thing happens and then another.");
        assert_eq!(title.details.imdb_rating, "7.4");
        assert_eq!(title.details.release_date, "1999-03-30");
        assert_eq!(title.details.genre, "Action, Sci-Fi");
        assert_eq!(title.details.casts, "A Person, B Person");
        assert_eq!(title.details.duration, "136 min");
        assert_eq!(title.details.country, "United States");
        assert_eq!(title.details.production, "Big Studio");
        assert_eq!(title.kind, TitleKind::Movie);
    }

    #[test]
    fn test_parse_detail_missing_link_is_fatal() {
        let html = r#"<div class="dp-i-content"><h2 class="heading-name">No Link</h2></div>"#;
        let result = IndexSiteClient::parse_detail(html, TitleKind::Movie);
        assert!(matches!(result, Err(FetchError::Fatal(_))));
    }

    #[test]
    fn test_parse_detail_missing_content_is_fatal() {
        let result = IndexSiteClient::parse_detail("<html><body></body></html>", TitleKind::Movie);
        assert!(matches!(result, Err(FetchError::Fatal(_))));
    }

    #[test]
    fn test_listing_url() {
        let client = IndexSiteClient::new(IndexSiteConfig::default()).unwrap();
        let url = client.listing_url(TitleKind::Series, 3);
        assert!(url.ends_with("/tv?page=3"));
        assert!(url.starts_with(&IndexSiteConfig::default().proxy_url));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n   b  "), "a b");
        assert_eq!(clean_text("plain"), "plain");
    }
}
