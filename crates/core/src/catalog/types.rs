//! Catalog entity types.
//!
//! A `Title` is the root entity of the catalog, either a movie or a series.
//! The tree below it is built entirely from discovered source files:
//! series → seasons → episodes → source groups → files → stream links.
//! Provider metadata is attached during reconciliation and never replaces
//! discovered file data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of title an artifact family or store query refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TitleKind {
    Movie,
    Series,
}

impl TitleKind {
    /// Stable name used for checkpoint artifact file prefixes.
    pub fn artifact_prefix(&self) -> &'static str {
        match self {
            TitleKind::Movie => "movies",
            TitleKind::Series => "series",
        }
    }
}

/// Root catalog entity.
///
/// The site-assigned local ID is the merge key everywhere: checkpoint
/// merging, store upserts and reconciliation all key on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Title {
    Movie(Movie),
    Series(Series),
}

impl Title {
    /// The site-assigned local ID (merge key).
    pub fn local_id(&self) -> &str {
        match self {
            Title::Movie(m) => &m.movie_id,
            Title::Series(s) => &s.series_id,
        }
    }

    /// Display name as scraped from the index site.
    pub fn display_name(&self) -> &str {
        match self {
            Title::Movie(m) => &m.title,
            Title::Series(s) => &s.title,
        }
    }

    pub fn kind(&self) -> TitleKind {
        match self {
            Title::Movie(_) => TitleKind::Movie,
            Title::Series(_) => TitleKind::Series,
        }
    }

    /// The external provider ID, if reconciliation has set one.
    pub fn provider_id(&self) -> Option<u32> {
        match self {
            Title::Movie(m) => m.metadata.as_ref().map(|md| md.provider_id),
            Title::Series(s) => s.metadata.as_ref().map(|md| md.provider_id),
        }
    }
}

/// A movie title: files attach directly, there is no season/episode level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub movie_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: SiteDetails,
    #[serde(default)]
    pub files: Vec<MediaFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MovieMetadata>,
    pub scraped_at: DateTime<Utc>,
}

/// A series title: files hang off episodes grouped into seasons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub series_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: SiteDetails,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SeriesMetadata>,
    pub scraped_at: DateTime<Utc>,
}

impl Series {
    /// Sum of all season sizes in megabytes.
    pub fn total_size_mb(&self) -> u64 {
        self.seasons.iter().map(|s| s.size_mb).sum()
    }
}

/// Free-text rows scraped from the index site's detail page.
///
/// These are raw display strings, kept as the site renders them. Empty
/// means the row was absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteDetails {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub genre: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub casts: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub production: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub imdb_rating: String,
}

/// A season of a series. `number` is unique within the series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub season_id: String,
    pub name: String,
    pub number: u32,
    /// Sum of episode sizes, whole megabytes.
    pub size_mb: u64,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
}

/// An episode of a season. `number` is unique within the season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    pub name: String,
    pub number: u32,
    /// Sum of file sizes, whole megabytes.
    pub size_mb: u64,
    #[serde(default)]
    pub sources: Vec<SourceGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub still_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
}

/// A codec/quality variant grouping of files for one episode (or movie).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    pub source_id: String,
    pub name: String,
    #[serde(default)]
    pub files: Vec<MediaFile>,
}

/// A single hosted file. `file_id` is unique within its title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub file_id: u64,
    pub name: String,
    /// Host's display size string (e.g. "1.4 GB").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub links: Vec<StreamLink>,
}

/// A resolved stream URL at one quality tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamLink {
    pub quality: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub size: String,
}

/// Provider metadata merged into a movie on reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieMetadata {
    /// Authoritative provider ID; once set, re-sync goes straight to a
    /// detail fetch.
    pub provider_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub videos: Vec<VideoClip>,
    pub last_synced_at: DateTime<Utc>,
}

/// Provider metadata merged into a series on reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Authoritative provider ID; once set, re-sync goes straight to a
    /// detail fetch.
    pub provider_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f32>,
    #[serde(default)]
    pub number_of_seasons: u32,
    #[serde(default)]
    pub number_of_episodes: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub videos: Vec<VideoClip>,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub character: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub department: String,
    pub job: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

/// A provider-hosted promotional video (trailer or teaser).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoClip {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
}
