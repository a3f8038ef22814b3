//! YouTube Data API lookups for trailers and clips
//!
//! Trailer lookups fall back to video links buried in previously scraped
//! page text; clip and detail lookups are live-only.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{Provenance, UnifiedMovieResult};
use crate::storage::{FallbackQuery, SharedMovieStore};

use super::{api_client, json_str, store_fallback};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

lazy_static! {
    static ref VIDEO_ID: Regex =
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})")
            .expect("video id regex");
}

pub struct YoutubeClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    store: Option<SharedMovieStore>,
}

impl YoutubeClient {
    pub fn new(config: &ApiConfig, store: Option<SharedMovieStore>) -> Result<Self> {
        Ok(Self {
            client: api_client(config.api_timeout_secs)?,
            api_key: config.youtube_api_key.clone(),
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
        self.api_key.is_some()
    }

    /// Best trailer match for a movie
    ///
    /// Prefers results titled as official or HD trailers, then falls back
    /// to the first hit, then to trailer links in the scraped store.
    pub async fn search_movie_trailer(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Option<UnifiedMovieResult> {
        if self.is_enabled() {
            let query = match year {
                Some(year) => format!("{title} {year} official trailer"),
                None => format!("{title} official trailer"),
            };
            match self.search_videos(&query, 5).await {
                Ok(items) => {
                    let preferred = items.iter().find(|item| {
                        let video_title = json_str(&item["snippet"], "title")
                            .unwrap_or_default()
                            .to_lowercase();
                        video_title.contains("trailer")
                            && (video_title.contains("official") || video_title.contains("hd"))
                    });
                    if let Some(item) = preferred.or_else(|| items.first()) {
                        return format_search_item(item, year);
                    }
                }
                Err(e) => warn!(title, error = %e, "YouTube search failed, trying store"),
            }
        }
        self.fallback_trailer(title, year)
    }

    /// Clips and scenes for a movie; live-only
    pub async fn movie_clips(&self, title: &str, max_results: u32) -> Vec<UnifiedMovieResult> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let query = format!("{title} movie clip scene");
        match self.search_videos(&query, max_results).await {
            Ok(items) => items
                .iter()
                .filter_map(|item| format_search_item(item, None))
                .collect(),
            Err(e) => {
                warn!(title, error = %e, "YouTube clip search failed");
                Vec::new()
            }
        }
    }

    /// Statistics and duration for one video; live-only
    pub async fn video_details(&self, video_id: &str) -> Option<UnifiedMovieResult> {
        let key = self.api_key.clone()?;
        let params = vec![
            ("part".to_string(), "snippet,statistics,contentDetails".to_string()),
            ("id".to_string(), video_id.to_string()),
            ("key".to_string(), key),
        ];
        match self.get_json("/videos", &params).await {
            Ok(payload) => {
                let item = payload.get("items")?.as_array()?.first()?;
                let mut result = format_search_item_with_id(item, video_id, None)?;
                if let Some(duration) = json_str(&item["contentDetails"], "duration") {
                    result.set("duration", duration);
                }
                if let Some(views) = json_str(&item["statistics"], "viewCount") {
                    result.set("view_count", views);
                }
                if let Some(likes) = json_str(&item["statistics"], "likeCount") {
                    result.set("like_count", likes);
                }
                Some(result)
            }
            Err(e) => {
                warn!(video_id, error = %e, "YouTube video lookup failed");
                None
            }
        }
    }

    fn fallback_trailer(&self, title: &str, year: Option<i32>) -> Option<UnifiedMovieResult> {
        let query = FallbackQuery::title(title)
            .year(year)
            .payload_contains_any(&["youtube", "trailer"]);
        let mut result = store_fallback(&self.store, &query)?;
        // recover a concrete video link from the stored page text
        let payload = serde_json::to_string(&result.extra).unwrap_or_default();
        if let Some(captures) = VIDEO_ID.captures(&payload) {
            let video_id = captures[1].to_string();
            result.set("url", format!("https://youtube.com/watch?v={video_id}"));
            result.set("video_id", video_id);
        }
        Some(result)
    }

    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<Value>> {
        let key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::config("YouTube API key missing"))?;
        let params = vec![
            ("part".to_string(), "snippet".to_string()),
            ("q".to_string(), query.to_string()),
            ("type".to_string(), "video".to_string()),
            ("maxResults".to_string(), max_results.to_string()),
            ("key".to_string(), key),
        ];
        let payload = self.get_json("/search", &params).await?;
        Ok(payload
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
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

fn format_search_item(item: &Value, year: Option<i32>) -> Option<UnifiedMovieResult> {
    let video_id = json_str(&item["id"], "videoId")?;
    format_search_item_with_id(item, video_id, year)
}

fn format_search_item_with_id(
    item: &Value,
    video_id: &str,
    year: Option<i32>,
) -> Option<UnifiedMovieResult> {
    let snippet = item.get("snippet")?;
    let title = json_str(snippet, "title")?;

    let mut result = UnifiedMovieResult::new(Provenance::Api("YouTube"), title, year);
    result.set("video_id", video_id);
    result.set("url", format!("https://youtube.com/watch?v={video_id}"));
    if let Some(channel) = json_str(snippet, "channelTitle") {
        result.set("channel", channel);
    }
    if let Some(published) = json_str(snippet, "publishedAt") {
        result.set("published_at", published);
    }
    if let Some(description) = json_str(snippet, "description") {
        result.set("description", description.chars().take(200).collect::<String>());
    }
    if let Some(thumb) = snippet
        .pointer("/thumbnails/high/url")
        .and_then(Value::as_str)
    {
        result.set("thumbnail", thumb);
    }
    Some(result)
}
