use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::{error::AppResult, models::NewMovie};

const DESCRIPTION_LIMIT: usize = 245;

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    image_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        base_url: String,
        image_url: String,
        rps: u32,
    ) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_ACCESS_TOKEN provided");
        }

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, access_token, base_url, image_url, limiter }
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    fn is_mock(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    pub async fn search_movies(&self, title: &str) -> AppResult<Vec<SearchResult>> {
        if self.is_mock() {
            return Ok(mock::search(title));
        }

        self.limiter.until_ready().await;

        let url = format!("{}/search/movie", self.base_url.trim_end_matches('/'));
        let resp: SearchResponse = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .query(&[("query", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(query = %title, results = resp.results.len(), "tmdb search");
        Ok(resp.results)
    }

    pub async fn get_movie(&self, tmdb_id: i64) -> AppResult<MovieDetails> {
        if self.is_mock() {
            return Ok(mock::details(tmdb_id));
        }

        self.limiter.until_ready().await;

        let url = format!("{}/movie/{}", self.base_url.trim_end_matches('/'), tmdb_id);
        let details: MovieDetails = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(tmdb_id, title = %details.title, "tmdb details");
        Ok(details)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl MovieDetails {
    pub fn to_new_movie(&self, image_base: &str) -> NewMovie {
        let release_date = self.release_date.as_deref().unwrap_or_default();
        let year = release_date.split('-').next().unwrap_or_default().to_string();

        let image_url = match self.poster_path.as_deref() {
            Some(path) if !path.is_empty() => {
                format!("{}/{}", image_base.trim_end_matches('/'), path.trim_start_matches('/'))
            },
            _ => String::new(),
        };

        NewMovie {
            title: self.title.clone(),
            year,
            description: truncate_overview(self.overview.as_deref().unwrap_or_default()),
            image_url,
        }
    }
}

fn truncate_overview(overview: &str) -> String {
    match overview.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}..", &overview[..cut]),
        None => overview.to_string(),
    }
}

/// Canned metadata served when no access token is configured.
mod mock {
    use super::{MovieDetails, SearchResult};

    pub const FIGHT_CLUB: i64 = 550;

    const FIGHT_CLUB_OVERVIEW: &str = "A ticking-time-bomb insomniac and a slippery soap salesman \
        channel primal male aggression into a shocking new form of therapy. Their concept catches \
        on, with underground \"fight clubs\" forming in every town, until an eccentric gets in the \
        way and ignites an out-of-control spiral toward oblivion.";

    pub fn search(title: &str) -> Vec<SearchResult> {
        let title = title.trim();
        [FIGHT_CLUB, 1000 + title.len() as i64]
            .into_iter()
            .map(|id| {
                let d = details(id);
                SearchResult {
                    id,
                    title: if id == FIGHT_CLUB { d.title } else { format!("{title} (mock)") },
                    release_date: d.release_date,
                    overview: d.overview,
                    poster_path: d.poster_path,
                }
            })
            .collect()
    }

    pub fn details(id: i64) -> MovieDetails {
        if id == FIGHT_CLUB {
            return MovieDetails {
                title: "Fight Club".to_string(),
                release_date: Some("1999-10-15".to_string()),
                overview: Some(FIGHT_CLUB_OVERVIEW.to_string()),
                poster_path: Some("/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg".to_string()),
            };
        }
        MovieDetails {
            title: format!("Mock Film {id}"),
            release_date: Some("2001-12-19".to_string()),
            overview: Some("A short mock overview.".to_string()),
            poster_path: Some(format!("/mock-{id}.jpg")),
        }
    }
}
