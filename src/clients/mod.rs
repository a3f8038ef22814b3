//! External metadata providers with scraped-store fallback
//!
//! Each client is enabled iff its credential is configured (Wikipedia needs
//! none). Lookups never return errors: a disabled client or a failed call
//! falls back to the local store where a fallback is defined, otherwise the
//! lookup just comes back empty. Callers can tell the tiers apart only via
//! [`Provenance`](crate::models::Provenance).

pub mod omdb;
pub mod tmdb;
pub mod wikipedia;
pub mod youtube;

use std::time::Duration;

use chrono::SecondsFormat;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::models::{Provenance, StoredRecord, UnifiedMovieResult};
use crate::storage::{FallbackQuery, SharedMovieStore};

pub use omdb::OmdbClient;
pub use tmdb::TmdbClient;
pub use wikipedia::WikipediaClient;
pub use youtube::YoutubeClient;

/// HTTP client shared plumbing for all providers
pub(crate) fn api_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .gzip(true)
        .build()
        .map_err(|e| Error::Fetch(e.into()))
}

/// Map a stored row onto the unified result shape
pub(crate) fn scraped_to_unified(record: &StoredRecord) -> UnifiedMovieResult {
    let mut result = UnifiedMovieResult::new(
        Provenance::Scraped(record.source_site.clone()),
        record.movie_title.clone(),
        record.year,
    );
    if let Some(payload) = record.processed_data.as_object() {
        for (key, value) in payload {
            if key != "title" && key != "year" {
                result.extra.insert(key.clone(), value.clone());
            }
        }
    }
    result.set(
        "scraped_at",
        record
            .scraped_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    result
}

/// Serve a lookup from the store, if one is attached and has a match
pub(crate) fn store_fallback(
    store: &Option<SharedMovieStore>,
    query: &FallbackQuery,
) -> Option<UnifiedMovieResult> {
    let store = store.as_ref()?;
    match store.find_latest(query) {
        Ok(Some(record)) => {
            info!(title = %record.movie_title, site = %record.source_site, "lookup served from scraped store");
            Some(scraped_to_unified(&record))
        }
        Ok(None) => None,
        Err(e) => {
            error!(title = %query.title, error = %e, "store fallback failed");
            None
        }
    }
}

/// String field accessor that treats placeholder values as absent
pub(crate) fn json_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty() && *s != "N/A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use crate::storage::{MovieStore, SqliteMovieStore};
    use std::sync::Arc;

    #[test]
    fn test_scraped_to_unified_carries_payload_and_provenance() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let mut rec = crate::models::RawRecord::new(
            DataType::FilmDetails,
            "Inception",
            "Film Wiki",
            "https://example.org/wiki/Inception",
        )
        .with_year(Some(2010));
        rec.set("director", "Christopher Nolan");
        store.upsert(&rec).unwrap();

        let stored = store
            .find_latest(&FallbackQuery::title("Inception"))
            .unwrap()
            .unwrap();
        let unified = scraped_to_unified(&stored);
        assert_eq!(unified.source, Provenance::Scraped("Film Wiki".into()));
        assert_eq!(unified.title, "Inception");
        assert_eq!(unified.year, Some(2010));
        assert_eq!(unified.get_str("director"), Some("Christopher Nolan"));
        assert!(unified.get_str("scraped_at").is_some());
    }

    #[test]
    fn test_store_fallback_without_store_is_none() {
        let query = FallbackQuery::title("Anything");
        assert!(store_fallback(&None, &query).is_none());

        let store: SharedMovieStore = Arc::new(SqliteMovieStore::in_memory().unwrap());
        assert!(store_fallback(&Some(store), &query).is_none());
    }

    #[test]
    fn test_json_str_filters_placeholders() {
        let v = serde_json::json!({"a": "value", "b": "N/A", "c": ""});
        assert_eq!(json_str(&v, "a"), Some("value"));
        assert_eq!(json_str(&v, "b"), None);
        assert_eq!(json_str(&v, "c"), None);
        assert_eq!(json_str(&v, "missing"), None);
    }
}
