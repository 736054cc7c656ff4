//! Hierarchical extraction and grouping.
//!
//! Turns a flat file listing into the catalog tree: filenames are matched
//! against episode patterns (unmatched files are dropped by policy, not
//! error), grouped into episodes, then into codec-variant source groups.
//! Aggregate sizes are summed bottom-up in whole megabytes.

use std::collections::{BTreeMap, HashMap};

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::error::FetchError;
use super::file_host::{FileHostClient, RawFileEntry};
use super::pool::RetryPolicy;
use crate::catalog::{Episode, MediaFile, SourceGroup};

/// Episode filename matchers, in priority order.
static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // S03E05, s03e05
        Regex::new(r"[Ss](\d+)[Ee](\d+)").expect("invalid episode pattern"),
        // .3x05.
        Regex::new(r"\.(\d+)x(\d+)\.").expect("invalid episode pattern"),
    ]
});

/// Season/episode numbers plus quality/codec tags parsed from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeTag {
    pub season: u32,
    pub episode: u32,
    pub quality: &'static str,
    pub codec: &'static str,
}

/// Match a filename against the episode patterns, first hit wins.
pub fn parse_episode_tag(filename: &str) -> Option<EpisodeTag> {
    for pattern in EPISODE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(filename) {
            let season = caps.get(1)?.as_str().parse().ok()?;
            let episode = caps.get(2)?.as_str().parse().ok()?;
            return Some(EpisodeTag {
                season,
                episode,
                quality: quality_label(filename),
                codec: codec_tag(filename),
            });
        }
    }
    None
}

/// Resolution label from a filename.
pub fn quality_label(filename: &str) -> &'static str {
    if filename.contains("1080p") {
        "1080p"
    } else if filename.contains("720p") {
        "720p"
    } else if filename.contains("2160p") || filename.contains("4K") {
        "4K"
    } else {
        "Standard"
    }
}

/// Codec tag from a filename; the grouping factor for source groups.
pub fn codec_tag(filename: &str) -> &'static str {
    if filename.contains("x265") || filename.contains("HEVC") {
        "HEVC/x265"
    } else if filename.contains("x264") || filename.contains("h264") {
        "H.264/x264"
    } else if filename.contains("AV1") {
        "AV1"
    } else {
        "Unknown"
    }
}

/// Deterministic derived ID for grouping keys.
pub fn derived_id(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Whole megabytes, rounding down.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

/// Minimal file record used when per-file enrichment fails.
pub fn minimal_file(entry: &RawFileEntry) -> MediaFile {
    MediaFile {
        file_id: entry.file_id,
        name: entry.name.clone(),
        size: entry.size.clone(),
        thumbnail: entry.thumbnail.clone(),
        links: Vec::new(),
    }
}

/// Resolve details and stream links for every listed file.
///
/// Runs as a bounded fan-out independent of the outer pool's pacing and
/// joins before grouping continues. Output is sorted by file ID so it never
/// depends on completion order. A file whose detail fetch fails degrades to
/// a minimal record; a file whose quality fetch fails keeps its details
/// with no links.
pub async fn enrich_files(host: &FileHostClient, entries: &[RawFileEntry]) -> Vec<MediaFile> {
    let policy = host.config().retry_policy();
    let concurrency = host.config().enrich_concurrency.max(1);

    let mut files: Vec<MediaFile> = stream::iter(entries.to_vec())
        .map(|entry| async move {
            match enrich_one(host, &policy, &entry).await {
                Ok(file) => file,
                Err(e) => {
                    warn!(
                        fid = entry.file_id,
                        file = %entry.name,
                        error = %e,
                        "file enrichment failed, keeping minimal record"
                    );
                    minimal_file(&entry)
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    files.sort_by_key(|f| f.file_id);
    files
}

async fn enrich_one(
    host: &FileHostClient,
    policy: &RetryPolicy,
    entry: &RawFileEntry,
) -> Result<MediaFile, FetchError> {
    let details = policy.run(|| host.file_details(entry.file_id)).await?;

    let links = match policy.run(|| host.quality_links(entry.file_id)).await {
        Ok(links) => links,
        Err(e) => {
            warn!(fid = entry.file_id, error = %e, "quality list unavailable");
            Vec::new()
        }
    };

    Ok(MediaFile {
        file_id: details.file_id,
        name: details.name,
        size: details.size,
        thumbnail: details.thumbnail,
        links,
    })
}

/// Group raw files into episodes, then codec-variant sources within each.
///
/// `enriched` carries the resolved file records keyed by file ID; a raw
/// entry without one falls back to a minimal record.
pub fn build_episodes(entries: &[RawFileEntry], enriched: &[MediaFile]) -> Vec<Episode> {
    let by_id: HashMap<u64, &MediaFile> = enriched.iter().map(|f| (f.file_id, f)).collect();

    let mut groups: BTreeMap<(u32, u32), Vec<&RawFileEntry>> = BTreeMap::new();
    for entry in entries {
        match parse_episode_tag(&entry.name) {
            Some(tag) => groups
                .entry((tag.season, tag.episode))
                .or_default()
                .push(entry),
            None => {
                debug!(file = %entry.name, "no episode pattern matched, dropping file");
            }
        }
    }

    groups
        .into_iter()
        .map(|((season, episode), files)| {
            let key = format!("S{}E{}", season, episode);
            let size_mb = bytes_to_mb(files.iter().map(|f| f.size_bytes).sum());
            Episode {
                episode_id: derived_id(&key),
                name: format!("Episode {}", episode),
                number: episode,
                size_mb,
                sources: build_sources(&files, &by_id),
                provider_id: None,
                air_date: None,
                still_path: None,
                overview: None,
                vote_average: None,
                vote_count: None,
            }
        })
        .collect()
}

fn build_sources(
    entries: &[&RawFileEntry],
    by_id: &HashMap<u64, &MediaFile>,
) -> Vec<SourceGroup> {
    let mut by_codec: BTreeMap<&'static str, Vec<&RawFileEntry>> = BTreeMap::new();
    for entry in entries {
        by_codec.entry(codec_tag(&entry.name)).or_default().push(entry);
    }

    by_codec
        .into_iter()
        .map(|(codec, group)| {
            let mut files: Vec<MediaFile> = group
                .iter()
                .map(|e| {
                    by_id
                        .get(&e.file_id)
                        .map(|f| (*f).clone())
                        .unwrap_or_else(|| minimal_file(e))
                })
                .collect();
            files.sort_by_key(|f| f.file_id);

            SourceGroup {
                source_id: derived_id(codec),
                name: codec.to_string(),
                files,
            }
        })
        .collect()
}
