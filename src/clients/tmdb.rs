//! TMDb lookups with scraped-store fallback
//!
//! Accepts either a v4 read access token (sent as a bearer header) or a v3
//! API key (sent as a query parameter); the token wins when both exist.

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{Provenance, UnifiedMovieResult};
use crate::storage::SharedMovieStore;

use super::{api_client, json_str, scraped_to_unified};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Cap on results served from either tier
const MAX_RESULTS: usize = 20;

enum Credential {
    Bearer(String),
    Key(String),
}

pub struct TmdbClient {
    client: reqwest::Client,
    credential: Option<Credential>,
    base_url: String,
    store: Option<SharedMovieStore>,
}

impl TmdbClient {
    pub fn new(config: &ApiConfig, store: Option<SharedMovieStore>) -> Result<Self> {
        let credential = config
            .tmdb_read_access_token
            .clone()
            .map(Credential::Bearer)
            .or_else(|| config.tmdb_api_key.clone().map(Credential::Key));
        Ok(Self {
            client: api_client(config.api_timeout_secs)?,
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            store,
        })
    }

    /// Point the client at a test server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.credential.is_some()
    }

    /// Title search; store fallback uses substring matching
    pub async fn search_movies(&self, query: &str, year: Option<i32>) -> Vec<UnifiedMovieResult> {
        if self.is_enabled() {
            let mut params = vec![
                ("query".to_string(), query.to_string()),
                ("include_adult".to_string(), "false".to_string()),
            ];
            if let Some(year) = year {
                params.push(("year".to_string(), year.to_string()));
            }
            match self.get_json("/search/movie", &params).await {
                Ok(payload) => return format_results(&payload),
                Err(e) => warn!(query, error = %e, "TMDb search failed, trying store"),
            }
        }
        self.fallback_search(query, year)
    }

    /// Full details for one TMDb movie id; no store fallback
    pub async fn movie_details(&self, movie_id: i64) -> Option<UnifiedMovieResult> {
        if !self.is_enabled() {
            return None;
        }
        let params = vec![(
            "append_to_response".to_string(),
            "credits,videos".to_string(),
        )];
        match self.get_json(&format!("/movie/{movie_id}"), &params).await {
            Ok(payload) => {
                let mut result = format_movie(&payload)?;
                if let Some(runtime) = payload.get("runtime").and_then(Value::as_i64) {
                    result.set("runtime_minutes", runtime);
                }
                if let Some(genres) = payload.get("genres").and_then(Value::as_array) {
                    let names: Vec<&str> = genres
                        .iter()
                        .filter_map(|g| json_str(g, "name"))
                        .collect();
                    result.set("genres", names.join(", "));
                }
                Some(result)
            }
            Err(e) => {
                warn!(movie_id, error = %e, "TMDb details lookup failed");
                None
            }
        }
    }

    /// Trending movies; the store stands in with recent box-office and
    /// award entries when the API is unavailable
    pub async fn trending(&self, window: &str) -> Vec<UnifiedMovieResult> {
        if self.is_enabled() {
            match self
                .get_json(&format!("/trending/movie/{window}"), &[])
                .await
            {
                Ok(payload) => return format_results(&payload),
                Err(e) => warn!(window, error = %e, "TMDb trending failed, trying store"),
            }
        }
        let since_year = Utc::now().year() - 2;
        match &self.store {
            Some(store) => match store.recent_highlights(since_year, 10) {
                Ok(records) => records.iter().map(scraped_to_unified).collect(),
                Err(e) => {
                    warn!(error = %e, "store highlights failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    /// Recommendations for one movie id; no store fallback
    pub async fn recommendations(&self, movie_id: i64) -> Vec<UnifiedMovieResult> {
        if !self.is_enabled() {
            return Vec::new();
        }
        match self
            .get_json(&format!("/movie/{movie_id}/recommendations"), &[])
            .await
        {
            Ok(payload) => format_results(&payload),
            Err(e) => {
                warn!(movie_id, error = %e, "TMDb recommendations failed");
                Vec::new()
            }
        }
    }

    fn fallback_search(&self, query: &str, year: Option<i32>) -> Vec<UnifiedMovieResult> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.search_titles(query, year, MAX_RESULTS as u32) {
            Ok(records) => {
                if !records.is_empty() {
                    debug!(query, hits = records.len(), "search served from scraped store");
                }
                records.iter().map(scraped_to_unified).collect()
            }
            Err(e) => {
                warn!(query, error = %e, "store search failed");
                Vec::new()
            }
        }
    }

    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let mut request = self.client.get(format!("{}{path}", self.base_url));
        match &self.credential {
            Some(Credential::Bearer(token)) => {
                request = request.bearer_auth(token);
            }
            Some(Credential::Key(key)) => {
                request = request.query(&[("api_key", key.as_str())]);
            }
            None => {}
        }
        let response = request
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

fn format_results(payload: &Value) -> Vec<UnifiedMovieResult> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(format_movie).take(MAX_RESULTS).collect())
        .unwrap_or_default()
}

fn format_movie(item: &Value) -> Option<UnifiedMovieResult> {
    let title = json_str(item, "title")?;
    let year = json_str(item, "release_date")
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok());

    let mut result = UnifiedMovieResult::new(Provenance::Api("TMDb"), title, year);
    if let Some(id) = item.get("id").and_then(Value::as_i64) {
        result.set("tmdb_id", id);
    }
    if let Some(overview) = json_str(item, "overview") {
        result.set("overview", overview);
    }
    if let Some(release_date) = json_str(item, "release_date") {
        result.set("release_date", release_date);
    }
    if let Some(vote) = item.get("vote_average").and_then(Value::as_f64) {
        result.set("vote_average", vote);
    }
    if let Some(popularity) = item.get("popularity").and_then(Value::as_f64) {
        result.set("popularity", popularity);
    }
    if let Some(poster) = json_str(item, "poster_path") {
        result.set("poster_url", format!("{IMAGE_BASE_URL}{poster}"));
    }
    Some(result)
}
