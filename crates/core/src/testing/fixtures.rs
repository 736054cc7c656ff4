//! Shared test fixtures.

use chrono::{TimeZone, Utc};

use crate::catalog::{
    Episode, MediaFile, Movie, Season, Series, SiteDetails, SourceGroup, Title,
};
use crate::metadata::{
    EpisodeDetail, MovieDetails, MovieSummary, ProviderCast, ProviderCrew, ProviderGenre,
    ProviderVideo, SeasonDetails, SeasonSummary, SeriesDetails, SeriesSummary,
};

/// A movie search result with the given rank-relevant fields.
pub fn movie_summary(id: u32, title: &str, year: Option<i32>, popularity: f64) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        original_title: None,
        release_date: year.map(|y| format!("{}-06-15", y)),
        overview: Some(format!("{} overview", title)),
        poster_path: None,
        popularity,
        vote_average: Some(7.0),
    }
}

/// A series search result.
pub fn series_summary(id: u32, name: &str, year: Option<i32>, popularity: f64) -> SeriesSummary {
    SeriesSummary {
        id,
        name: name.to_string(),
        original_name: None,
        first_air_date: year.map(|y| format!("{}-01-20", y)),
        overview: Some(format!("{} overview", name)),
        poster_path: None,
        popularity,
        vote_average: Some(8.0),
    }
}

/// A movie detail record with a small cast/crew/video set.
pub fn movie_details(id: u32, title: &str, year: i32) -> MovieDetails {
    MovieDetails {
        id,
        title: title.to_string(),
        imdb_id: Some(format!("tt{:07}", id)),
        release_date: Some(format!("{}-06-15", year)),
        runtime_minutes: Some(110),
        overview: Some(format!("{} full overview", title)),
        poster_path: Some("/poster.jpg".to_string()),
        backdrop_path: Some("/backdrop.jpg".to_string()),
        popularity: Some(12.5),
        vote_average: Some(7.4),
        vote_count: Some(1200),
        genres: vec![
            ProviderGenre {
                id: 18,
                name: "Drama".to_string(),
            },
            ProviderGenre {
                id: 53,
                name: "Thriller".to_string(),
            },
        ],
        cast: (0..12)
            .map(|i| ProviderCast {
                id: 100 + i,
                name: format!("Actor {}", i),
                character: format!("Character {}", i),
                profile_path: None,
            })
            .collect(),
        crew: vec![
            ProviderCrew {
                id: 200,
                name: "The Director".to_string(),
                department: "Directing".to_string(),
                job: "Director".to_string(),
                profile_path: None,
            },
            ProviderCrew {
                id: 201,
                name: "The Gaffer".to_string(),
                department: "Lighting".to_string(),
                job: "Gaffer".to_string(),
                profile_path: None,
            },
        ],
        videos: vec![
            ProviderVideo {
                id: "v1".to_string(),
                key: "trailer-key".to_string(),
                name: "Official Trailer".to_string(),
                site: "YouTube".to_string(),
                video_type: "Trailer".to_string(),
                official: true,
            },
            ProviderVideo {
                id: "v2".to_string(),
                key: "clip-key".to_string(),
                name: "Clip".to_string(),
                site: "YouTube".to_string(),
                video_type: "Clip".to_string(),
                official: true,
            },
            ProviderVideo {
                id: "v3".to_string(),
                key: "vimeo-key".to_string(),
                name: "Teaser elsewhere".to_string(),
                site: "Vimeo".to_string(),
                video_type: "Teaser".to_string(),
                official: true,
            },
        ],
    }
}

/// A series detail record listing the given season numbers (plus specials).
pub fn series_details(id: u32, name: &str, year: i32, season_numbers: &[u32]) -> SeriesDetails {
    let mut seasons = vec![SeasonSummary {
        provider_id: 9000,
        season_number: 0,
        name: Some("Specials".to_string()),
        air_date: None,
        poster_path: None,
        episode_count: 3,
    }];
    seasons.extend(season_numbers.iter().map(|n| SeasonSummary {
        provider_id: 9000 + n,
        season_number: *n,
        name: Some(format!("Season {}", n)),
        air_date: Some(format!("{}-01-20", year)),
        poster_path: Some(format!("/season{}.jpg", n)),
        episode_count: 10,
    }));

    SeriesDetails {
        id,
        name: name.to_string(),
        first_air_date: Some(format!("{}-01-20", year)),
        last_air_date: Some(format!("{}-09-29", year + 4)),
        status: Some("Ended".to_string()),
        overview: Some(format!("{} full overview", name)),
        poster_path: Some("/poster.jpg".to_string()),
        backdrop_path: None,
        popularity: Some(80.0),
        vote_average: Some(8.8),
        vote_count: Some(9000),
        number_of_seasons: season_numbers.len() as u32,
        number_of_episodes: season_numbers.len() as u32 * 10,
        genres: vec![ProviderGenre {
            id: 18,
            name: "Drama".to_string(),
        }],
        networks: vec![],
        seasons,
        cast: vec![ProviderCast {
            id: 300,
            name: "Lead Actor".to_string(),
            character: "Lead".to_string(),
            profile_path: None,
        }],
        crew: vec![
            ProviderCrew {
                id: 400,
                name: "The Creator".to_string(),
                department: "Writing".to_string(),
                job: "Creator".to_string(),
                profile_path: None,
            },
            ProviderCrew {
                id: 401,
                name: "The Editor".to_string(),
                department: "Editing".to_string(),
                job: "Editor".to_string(),
                profile_path: None,
            },
        ],
        videos: vec![],
    }
}

/// A season detail record with the given number of episodes.
pub fn season_details(series_id: u32, season_number: u32, episodes: u32) -> SeasonDetails {
    SeasonDetails {
        provider_id: 9000 + series_id + season_number,
        season_number,
        name: Some(format!("Season {}", season_number)),
        overview: Some("A season".to_string()),
        air_date: Some("2008-01-20".to_string()),
        poster_path: None,
        episodes: (1..=episodes)
            .map(|n| EpisodeDetail {
                provider_id: 60000 + n,
                episode_number: n,
                name: format!("Provider Episode {}", n),
                overview: Some(format!("Episode {} overview", n)),
                air_date: Some("2008-01-27".to_string()),
                still_path: Some(format!("/still{}.jpg", n)),
                vote_average: Some(8.5),
                vote_count: Some(500),
            })
            .collect(),
    }
}

/// A media file with no links.
pub fn media_file(fid: u64, name: &str) -> MediaFile {
    MediaFile {
        file_id: fid,
        name: name.to_string(),
        size: "1.4 GB".to_string(),
        thumbnail: None,
        links: vec![],
    }
}

/// A local movie title with one file.
pub fn local_movie(local_id: &str, title: &str, file_name: &str) -> Movie {
    Movie {
        movie_id: local_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        details: SiteDetails::default(),
        files: vec![media_file(1, file_name)],
        metadata: None,
        scraped_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// A local series title with the given (season, episode-count) layout.
pub fn local_series(local_id: &str, title: &str, layout: &[(u32, u32)]) -> Series {
    let seasons = layout
        .iter()
        .map(|(season_number, episode_count)| Season {
            season_id: format!("season_{}", season_number),
            name: format!("Season {}", season_number),
            number: *season_number,
            size_mb: 1000,
            episodes: (1..=*episode_count)
                .map(|n| Episode {
                    episode_id: format!("s{}e{}", season_number, n),
                    name: format!("Episode {}", n),
                    number: n,
                    size_mb: 100,
                    sources: vec![SourceGroup {
                        source_id: "src".to_string(),
                        name: "H.264/x264".to_string(),
                        files: vec![media_file(
                            u64::from(*season_number) * 100 + u64::from(n),
                            &format!("{}.S{:02}E{:02}.1080p.x264.mp4", title, season_number, n),
                        )],
                    }],
                    provider_id: None,
                    air_date: None,
                    still_path: None,
                    overview: None,
                    vote_average: None,
                    vote_count: None,
                })
                .collect(),
            provider_id: None,
            air_date: None,
            poster_path: None,
        })
        .collect();

    Series {
        series_id: local_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        details: SiteDetails::default(),
        seasons,
        metadata: None,
        scraped_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// Wrap a movie fixture as a `Title`.
pub fn movie_title(local_id: &str, title: &str, file_name: &str) -> Title {
    Title::Movie(local_movie(local_id, title, file_name))
}

/// Wrap a series fixture as a `Title`.
pub fn series_title(local_id: &str, title: &str, layout: &[(u32, u32)]) -> Title {
    Title::Series(local_series(local_id, title, layout))
}
