//! Core data model shared by the scrapers, the store, and the source clients

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Kind of data carried by a scraped record
///
/// Stored as its snake_case string in the `data_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    FilmOverview,
    FilmDetails,
    FilmListEntry,
    BoxOffice,
    Award,
    FestivalAward,
    AdultContent,
    WikipediaContent,
    General,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FilmOverview => "film_overview",
            Self::FilmDetails => "film_details",
            Self::FilmListEntry => "film_list_entry",
            Self::BoxOffice => "box_office",
            Self::Award => "award",
            Self::FestivalAward => "festival_award",
            Self::AdultContent => "adult_content",
            Self::WikipediaContent => "wikipedia_content",
            Self::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "film_overview" => Some(Self::FilmOverview),
            "film_details" => Some(Self::FilmDetails),
            "film_list_entry" => Some(Self::FilmListEntry),
            "box_office" => Some(Self::BoxOffice),
            "award" => Some(Self::Award),
            "festival_award" => Some(Self::FestivalAward),
            "adult_content" => Some(Self::AdultContent),
            "wikipedia_content" => Some(Self::WikipediaContent),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single extracted record before persistence
///
/// `fields` is a key-sorted map so that the content hash is independent of
/// the order fields were attached in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub data_type: DataType,
    pub title: String,
    pub year: Option<i32>,
    pub source_site: String,
    pub url: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn new(
        data_type: DataType,
        title: impl Into<String>,
        source_site: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            data_type,
            title: title.into(),
            year: None,
            source_site: source_site.into(),
            url: url.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Attach an extracted field
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Records without a title are never persisted
    pub fn is_persistable(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// SHA-256 over the canonical (key-sorted) JSON form of the record
    ///
    /// Two records with identical content produce the same hash regardless
    /// of the order their fields were attached in. `scraped_at` is not part
    /// of the record, so re-scraping unchanged content hashes identically.
    /// Extracted fields hash under their own `fields` key; a scraped column
    /// named `title` or `url` never masks the record attribute.
    pub fn content_hash(&self) -> String {
        let mut canonical: BTreeMap<&str, Value> = BTreeMap::new();
        canonical.insert("data_type", Value::from(self.data_type.as_str()));
        canonical.insert("title", Value::from(self.title.as_str()));
        canonical.insert(
            "year",
            self.year.map(Value::from).unwrap_or(Value::Null),
        );
        canonical.insert("source_site", Value::from(self.source_site.as_str()));
        canonical.insert("url", Value::from(self.url.as_str()));
        canonical.insert(
            "fields",
            Value::Object(
                self.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        );
        // BTreeMap serializes in key order, so this string is canonical
        let serialized = serde_json::to_string(&canonical).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A record as it exists in the `scraped_movie_data` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub source_site: String,
    pub movie_title: String,
    pub year: Option<i32>,
    pub data_type: String,
    pub raw_data: Value,
    pub processed_data: Value,
    pub data_hash: String,
    pub scraped_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn processed_str(&self, key: &str) -> Option<&str> {
        self.processed_data.get(key).and_then(Value::as_str)
    }
}

/// A configured scrape target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub scraping_rules: Value,
    pub last_scraped: Option<DateTime<Utc>>,
}

impl CrawlTarget {
    pub fn rule_str(&self, key: &str) -> Option<&str> {
        self.scraping_rules.get(key).and_then(Value::as_str)
    }

    /// Targets carrying `age_restriction: "18+"` in their scraping rules
    pub fn is_age_restricted(&self) -> bool {
        self.rule_str("age_restriction") == Some("18+")
    }
}

/// Outcome of a finished crawl pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Success,
    Failed,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One row of the crawl audit log
///
/// Every finished pass appends exactly one of these, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlLog {
    pub target_id: i64,
    pub status: CrawlStatus,
    pub pages_scraped: u32,
    pub records_extracted: u32,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Summary returned by [`CrawlRunner::run`](crate::scraper::CrawlRunner::run)
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target_name: String,
    pub status: CrawlStatus,
    pub pages_scraped: u32,
    pub records_extracted: u32,
    pub errors: Vec<String>,
    pub duration_secs: f64,
}

/// Where a unified result came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// A live call to the named provider, e.g. `Api("OMDb")`
    Api(&'static str),
    /// Served from the local store, carrying the original source site
    Scraped(String),
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(provider) => write!(f, "{provider} API"),
            Self::Scraped(site) => write!(f, "Scraped from {site}"),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A movie result normalized across live APIs and the scraped store
///
/// Callers can tell the tiers apart only through `source`.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedMovieResult {
    pub source: Provenance,
    pub title: String,
    pub year: Option<i32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl UnifiedMovieResult {
    pub fn new(source: Provenance, title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            source,
            title: title.into(),
            year,
            extra: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn is_from_api(&self) -> bool {
        matches!(self.source, Provenance::Api(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RawRecord {
        let mut rec = RawRecord::new(
            DataType::FilmDetails,
            "Inception",
            "Film Wiki",
            "https://example.org/wiki/Inception",
        )
        .with_year(Some(2010));
        rec.set("director", "Christopher Nolan");
        rec.set("runtime", "148 min");
        rec
    }

    #[test]
    fn test_content_hash_is_order_independent() {
        let mut a = RawRecord::new(DataType::BoxOffice, "Titanic", "Film Wiki", "u");
        a.set("gross", "$2.2 billion");
        a.set("rank", 1);

        let mut b = RawRecord::new(DataType::BoxOffice, "Titanic", "Film Wiki", "u");
        b.set("rank", 1);
        b.set("gross", "$2.2 billion");

        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = sample_record();
        let mut b = sample_record();
        b.set("runtime", "150 min");
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_field_cannot_mask_record_attribute() {
        // table headers become field names verbatim, so a column called
        // "url" must still hash separately from the page url
        let mut a = RawRecord::new(DataType::BoxOffice, "Titanic", "Film Wiki", "https://a.example");
        a.set("url", "https://shared.example");
        let mut b = RawRecord::new(DataType::BoxOffice, "Titanic", "Film Wiki", "https://b.example");
        b.set("url", "https://shared.example");

        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_persistable_requires_title() {
        let mut rec = sample_record();
        assert!(rec.is_persistable());
        rec.title = "   ".into();
        assert!(!rec.is_persistable());
    }

    #[test]
    fn test_data_type_round_trip() {
        for dt in [
            DataType::FilmOverview,
            DataType::FilmDetails,
            DataType::FilmListEntry,
            DataType::BoxOffice,
            DataType::Award,
            DataType::FestivalAward,
            DataType::AdultContent,
            DataType::WikipediaContent,
            DataType::General,
        ] {
            assert_eq!(DataType::parse(dt.as_str()), Some(dt));
        }
        assert_eq!(DataType::parse("bogus"), None);
    }

    #[test]
    fn test_provenance_rendering() {
        assert_eq!(Provenance::Api("OMDb").to_string(), "OMDb API");
        assert_eq!(
            Provenance::Scraped("Film Wiki".into()).to_string(),
            "Scraped from Film Wiki"
        );
    }

    #[test]
    fn test_unified_result_serializes_source_as_string() {
        let result = UnifiedMovieResult::new(Provenance::Api("TMDb"), "Heat", Some(1995));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "TMDb API");
        assert_eq!(json["title"], "Heat");
    }
}
