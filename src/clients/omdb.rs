//! OMDb lookups with scraped-store fallback

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{DataType, Provenance, UnifiedMovieResult};
use crate::storage::{FallbackQuery, SharedMovieStore};

use super::{api_client, json_str, store_fallback};

const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";
const POSTER_BASE_URL: &str = "https://img.omdbapi.com/";

/// Scraped data types that can stand in for an OMDb answer
const FALLBACK_TYPES: &[DataType] = &[DataType::FilmDetails, DataType::BoxOffice, DataType::Award];

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    poster_base_url: String,
    store: Option<SharedMovieStore>,
}

impl OmdbClient {
    pub fn new(config: &ApiConfig, store: Option<SharedMovieStore>) -> Result<Self> {
        Ok(Self {
            client: api_client(config.api_timeout_secs)?,
            api_key: config.omdb_api_key.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poster_base_url: POSTER_BASE_URL.to_string(),
            store,
        })
    }

    /// Point both endpoints at a test server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string() + "/";
        self.poster_base_url = self.base_url.clone();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Look up one movie by title, optionally narrowed by year
    pub async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Option<UnifiedMovieResult> {
        if let Some(key) = self.api_key.clone() {
            let mut params = vec![
                ("apikey".to_string(), key),
                ("t".to_string(), title.to_string()),
                ("type".to_string(), "movie".to_string()),
                ("plot".to_string(), "full".to_string()),
            ];
            if let Some(year) = year {
                params.push(("y".to_string(), year.to_string()));
            }
            match self.get_json(&params).await {
                Ok(payload) if payload.get("Response").and_then(Value::as_str) == Some("True") => {
                    return format_movie(&payload);
                }
                Ok(_) => debug!(title, "OMDb has no match"),
                Err(e) => warn!(title, error = %e, "OMDb request failed, trying store"),
            }
        }
        self.fallback(title, year)
    }

    /// Look up one movie by its IMDb id
    pub async fn movie_by_imdb_id(&self, imdb_id: &str) -> Option<UnifiedMovieResult> {
        let key = self.api_key.clone()?;
        let params = vec![
            ("apikey".to_string(), key),
            ("i".to_string(), imdb_id.to_string()),
            ("plot".to_string(), "full".to_string()),
        ];
        match self.get_json(&params).await {
            Ok(payload) if payload.get("Response").and_then(Value::as_str) == Some("True") => {
                format_movie(&payload)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(imdb_id, error = %e, "OMDb id lookup failed");
                None
            }
        }
    }

    /// Poster URL for an IMDb id, verified with a HEAD request
    pub async fn poster_url(&self, imdb_id: &str, height: u32) -> Option<String> {
        let key = self.api_key.as_ref()?;
        let url = format!(
            "{}?apikey={key}&i={imdb_id}&h={height}",
            self.poster_base_url
        );
        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => Some(url),
            Ok(response) => {
                debug!(imdb_id, status = response.status().as_u16(), "no poster available");
                None
            }
            Err(e) => {
                warn!(imdb_id, error = %e, "poster check failed");
                None
            }
        }
    }

    fn fallback(&self, title: &str, year: Option<i32>) -> Option<UnifiedMovieResult> {
        let query = FallbackQuery::title(title)
            .year(year)
            .data_types(FALLBACK_TYPES);
        store_fallback(&self.store, &query)
    }

    async fn get_json(&self, params: &[(String, String)]) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.into()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(crate::error::FetchError::Status(
                status.as_u16(),
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

fn format_movie(payload: &Value) -> Option<UnifiedMovieResult> {
    let title = json_str(payload, "Title")?;
    let year = json_str(payload, "Year")
        .and_then(|y| y.get(..4))
        .and_then(|y| y.parse().ok());

    let mut result = UnifiedMovieResult::new(Provenance::Api("OMDb"), title, year);
    let carried = [
        ("imdbID", "imdb_id"),
        ("Rated", "rated"),
        ("Released", "released"),
        ("Runtime", "runtime"),
        ("Genre", "genre"),
        ("Director", "director"),
        ("Writer", "writer"),
        ("Actors", "actors"),
        ("Plot", "plot"),
        ("Awards", "awards"),
        ("Poster", "poster"),
        ("imdbRating", "imdb_rating"),
        ("BoxOffice", "box_office"),
    ];
    for (from, to) in carried {
        if let Some(value) = json_str(payload, from) {
            result.set(to, value);
        }
    }
    Some(result)
}
