//! Wikipedia API lookups
//!
//! Needs no credential, so it is always enabled and carries no store
//! fallback; errors just produce empty results.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{Provenance, UnifiedMovieResult};
use crate::normalize::{collapse_whitespace, extract_year};

use super::{api_client, json_str};

const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Full revision wikitext runs much larger than search or extract
/// responses, so the infobox fetch overrides the client timeout
const INFOBOX_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").expect("tag regex");
    // stops at a closing brace pair on its own line, so nested date and
    // list templates inside parameter values survive
    static ref INFOBOX: Regex =
        Regex::new(r"(?si)\{\{Infobox film(.*?)\n\}\}").expect("infobox regex");
    static ref WIKI_LINK_PIPED: Regex =
        Regex::new(r"\[\[[^\]|]*\|([^\]]+)\]\]").expect("piped link regex");
    static ref WIKI_LINK: Regex = Regex::new(r"\[\[([^\]]+)\]\]").expect("link regex");
    static ref WIKI_REF: Regex = Regex::new(r"(?s)<ref[^>]*>.*?</ref>").expect("ref regex");
    static ref WIKI_TEMPLATE: Regex = Regex::new(r"\{\{[^}]*\}\}").expect("template regex");
    static ref WIKI_BOLD: Regex = Regex::new(r"'{2,}").expect("bold regex");
}

/// Infobox parameters worth surfacing, with their result field names
const INFOBOX_PARAMS: &[(&str, &str)] = &[
    ("director", "director"),
    ("producer", "producer"),
    ("writer", "writer"),
    ("starring", "cast"),
    ("released", "release_date"),
    ("runtime", "runtime"),
    ("country", "country"),
    ("language", "language"),
    ("budget", "budget"),
    ("gross", "box_office"),
];

pub struct WikipediaClient {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: api_client(config.api_timeout_secs)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a test server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Full-text search scoped to films
    pub async fn search_movies(&self, query: &str, limit: u32) -> Vec<UnifiedMovieResult> {
        let params = [
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srsearch", format!("{query} film")),
            ("srlimit", limit.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = match self.get_json(&params).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(query, error = %e, "Wikipedia search failed");
                return Vec::new();
            }
        };
        payload
            .pointer("/query/search")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| {
                        let title = json_str(hit, "title")?;
                        let mut result = UnifiedMovieResult::new(
                            Provenance::Api("Wikipedia"),
                            title,
                            extract_year(title),
                        );
                        if let Some(snippet) = json_str(hit, "snippet") {
                            let plain = HTML_TAG.replace_all(snippet, "");
                            result.set("snippet", collapse_whitespace(&plain));
                        }
                        if let Some(page_id) = hit.get("pageid").and_then(Value::as_i64) {
                            result.set("page_id", page_id);
                        }
                        result.set("url", page_url(title));
                        Some(result)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Plain-text extract of one article
    pub async fn page_content(&self, title: &str) -> Option<String> {
        let params = [
            ("action", "query".to_string()),
            ("prop", "extracts".to_string()),
            ("explaintext", "1".to_string()),
            ("redirects", "1".to_string()),
            ("titles", title.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = match self.get_json(&params).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(title, error = %e, "Wikipedia extract failed");
                return None;
            }
        };
        let pages = payload.pointer("/query/pages")?.as_object()?;
        pages
            .values()
            .next()
            .and_then(|page| json_str(page, "extract"))
            .map(str::to_string)
    }

    /// Structured film facts parsed out of the article's infobox wikitext
    pub async fn movie_infobox(&self, title: &str) -> Option<UnifiedMovieResult> {
        let params = [
            ("action", "query".to_string()),
            ("prop", "revisions".to_string()),
            ("rvprop", "content".to_string()),
            ("rvslots", "main".to_string()),
            ("redirects", "1".to_string()),
            ("titles", title.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = match self.get_json_with_timeout(&params, Some(INFOBOX_TIMEOUT)).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(title, error = %e, "Wikipedia revision fetch failed");
                return None;
            }
        };
        let pages = payload.pointer("/query/pages")?.as_object()?;
        let wikitext = pages
            .values()
            .next()?
            .pointer("/revisions/0/slots/main/*")
            .and_then(Value::as_str)?;
        parse_infobox(title, wikitext)
    }

    /// Article titles in the `Category:<year> films` category
    pub async fn films_by_year(&self, year: i32) -> Vec<String> {
        self.category_members(&format!("Category:{year} films"), 50)
            .await
    }

    /// Main-namespace member titles of a category
    pub async fn category_members(&self, category: &str, limit: u32) -> Vec<String> {
        let params = [
            ("action", "query".to_string()),
            ("list", "categorymembers".to_string()),
            ("cmtitle", category.to_string()),
            ("cmlimit", limit.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = match self.get_json(&params).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(category, error = %e, "Wikipedia category fetch failed");
                return Vec::new();
            }
        };
        payload
            .pointer("/query/categorymembers")
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.get("ns").and_then(Value::as_i64) == Some(0))
                    .filter_map(|m| json_str(m, "title"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn get_json(&self, params: &[(&str, String)]) -> Result<Value> {
        self.get_json_with_timeout(params, None).await
    }

    async fn get_json_with_timeout(
        &self,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let mut request = self.client.get(&self.base_url).query(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
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

fn page_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
}

/// Strip wiki markup from one parameter value
fn clean_wikitext(value: &str) -> String {
    let value = WIKI_REF.replace_all(value, "");
    let value = WIKI_TEMPLATE.replace_all(&value, "");
    let value = WIKI_LINK_PIPED.replace_all(&value, "$1");
    let value = WIKI_LINK.replace_all(&value, "$1");
    let value = WIKI_BOLD.replace_all(&value, "");
    let value = HTML_TAG.replace_all(&value, " ");
    collapse_whitespace(&value)
}

fn parse_infobox(title: &str, wikitext: &str) -> Option<UnifiedMovieResult> {
    let body = INFOBOX.captures(wikitext)?.get(1)?.as_str().to_string();
    let mut result = UnifiedMovieResult::new(Provenance::Api("Wikipedia"), title, None);
    for (param, field) in INFOBOX_PARAMS {
        let pattern = Regex::new(&format!(r"(?im)^\s*\|\s*{param}\s*=\s*(.+)$")).ok()?;
        if let Some(captures) = pattern.captures(&body) {
            if *field == "release_date" {
                result.year = extract_year(&captures[1]);
            }
            let cleaned = clean_wikitext(&captures[1]);
            if !cleaned.is_empty() {
                result.set(*field, cleaned);
            }
        }
    }
    if result.extra.is_empty() {
        return None;
    }
    result.set("url", page_url(title));
    Some(result)
}
