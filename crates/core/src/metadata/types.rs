//! Public metadata provider types.
//!
//! Search results carry the provider's relevance order; the reconciliation
//! matcher scores them by rank, so callers must preserve that ordering.

use serde::{Deserialize, Serialize};

fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// A movie search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub popularity: f64,
    pub vote_average: Option<f32>,
}

impl MovieSummary {
    /// Release year parsed from the date prefix.
    pub fn year(&self) -> Option<i32> {
        year_of(self.release_date.as_deref())
    }
}

/// A series search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub id: u32,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub popularity: f64,
    pub vote_average: Option<f32>,
}

impl SeriesSummary {
    /// First-air year parsed from the date prefix.
    pub fn year(&self) -> Option<i32> {
        year_of(self.first_air_date.as_deref())
    }
}

/// Full movie detail record, credits and videos included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u32,
    pub title: String,
    pub imdb_id: Option<String>,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: Option<f32>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub genres: Vec<ProviderGenre>,
    pub cast: Vec<ProviderCast>,
    pub crew: Vec<ProviderCrew>,
    pub videos: Vec<ProviderVideo>,
}

/// Full series detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDetails {
    pub id: u32,
    pub name: String,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub status: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: Option<f32>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub number_of_seasons: u32,
    pub number_of_episodes: u32,
    pub genres: Vec<ProviderGenre>,
    pub networks: Vec<ProviderNetwork>,
    pub seasons: Vec<SeasonSummary>,
    pub cast: Vec<ProviderCast>,
    pub crew: Vec<ProviderCrew>,
    pub videos: Vec<ProviderVideo>,
}

/// One season as listed on a series detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub provider_id: u32,
    pub season_number: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    pub episode_count: u32,
}

/// Full season detail record with its episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonDetails {
    pub provider_id: u32,
    pub season_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    pub episodes: Vec<EpisodeDetail>,
}

/// One episode on a season detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub provider_id: u32,
    pub episode_number: u32,
    pub name: String,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderNetwork {
    pub id: u32,
    pub name: String,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCast {
    pub id: u32,
    pub name: String,
    pub character: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCrew {
    pub id: u32,
    pub name: String,
    pub department: String,
    pub job: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderVideo {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    pub video_type: String,
    pub official: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_summary_year() {
        let movie = MovieSummary {
            id: 603,
            title: "The Matrix".to_string(),
            original_title: None,
            release_date: Some("1999-03-30".to_string()),
            overview: None,
            poster_path: None,
            popularity: 60.0,
            vote_average: Some(8.2),
        };
        assert_eq!(movie.year(), Some(1999));
    }

    #[test]
    fn test_year_absent_or_malformed() {
        let mut movie = MovieSummary {
            id: 1,
            title: "X".to_string(),
            original_title: None,
            release_date: None,
            overview: None,
            poster_path: None,
            popularity: 0.0,
            vote_average: None,
        };
        assert_eq!(movie.year(), None);

        movie.release_date = Some("n/a".to_string());
        assert_eq!(movie.year(), None);
    }

    #[test]
    fn test_series_summary_year() {
        let series = SeriesSummary {
            id: 1396,
            name: "Breaking Bad".to_string(),
            original_name: None,
            first_air_date: Some("2008-01-20".to_string()),
            overview: None,
            poster_path: None,
            popularity: 100.0,
            vote_average: Some(9.5),
        };
        assert_eq!(series.year(), Some(2008));
    }
}
