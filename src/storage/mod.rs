//! SQLite-backed persistence for scraped records, targets, and crawl logs
//!
//! The store is content-addressable: each record row is keyed by
//! `(source_site, movie_title, data_type, data_hash)`, so re-scraping
//! unchanged content refreshes a timestamp instead of growing the table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    params_from_iter, types::ToSql, Connection, OptionalExtension, Row, TransactionBehavior,
};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{CrawlLog, CrawlStatus, CrawlTarget, DataType, RawRecord, StoredRecord};
use crate::normalize;

/// Shared handle used by runners and source clients
pub type SharedMovieStore = Arc<dyn MovieStore>;

/// Outcome of [`MovieStore::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New content, a row was inserted
    Inserted(i64),
    /// Identical content already existed, its `scraped_at` was refreshed
    Refreshed(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Refreshed(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Query for serving a lookup from previously scraped data
///
/// Title matching is exact but case-insensitive; all other filters narrow.
#[derive(Debug, Clone, Default)]
pub struct FallbackQuery {
    pub title: String,
    pub year: Option<i32>,
    pub data_types: Vec<DataType>,
    /// Match rows whose processed payload contains any of these substrings
    pub payload_contains_any: Vec<String>,
}

impl FallbackQuery {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn data_types(mut self, types: &[DataType]) -> Self {
        self.data_types = types.to_vec();
        self
    }

    pub fn payload_contains_any(mut self, needles: &[&str]) -> Self {
        self.payload_contains_any = needles.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Persistence operations used across the crate
pub trait MovieStore: Send + Sync {
    /// Insert a record, or refresh `scraped_at` if identical content exists
    fn upsert(&self, record: &RawRecord) -> Result<UpsertOutcome, StoreError>;

    /// Most recently scraped row matching the query, if any
    fn find_latest(&self, query: &FallbackQuery) -> Result<Option<StoredRecord>, StoreError>;

    /// Latest row per distinct title whose title contains `pattern`
    fn search_titles(
        &self,
        pattern: &str,
        year: Option<i32>,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Latest box-office/award rows from `since_year` onwards
    fn recent_highlights(&self, since_year: i32, limit: u32)
        -> Result<Vec<StoredRecord>, StoreError>;

    /// Append one crawl audit row
    fn append_log(&self, log: &CrawlLog) -> Result<(), StoreError>;

    /// Set the target's `last_scraped` to now
    fn touch_target(&self, target_id: i64) -> Result<(), StoreError>;

    fn load_target(&self, target_id: i64) -> Result<CrawlTarget, StoreError>;

    fn add_target(&self, name: &str, base_url: &str, rules: &Value) -> Result<i64, StoreError>;

    fn list_targets(&self) -> Result<Vec<CrawlTarget>, StoreError>;

    fn logs_for_target(&self, target_id: i64, limit: u32) -> Result<Vec<CrawlLog>, StoreError>;
}

/// SQLite implementation of [`MovieStore`]
pub struct SqliteMovieStore {
    conn: Mutex<Connection>,
}

fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_json(idx: usize, raw: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let raw: String = row.get(5)?;
    let processed: String = row.get(6)?;
    let scraped_at: String = row.get(8)?;
    Ok(StoredRecord {
        id: row.get(0)?,
        source_site: row.get(1)?,
        movie_title: row.get(2)?,
        year: row.get(3)?,
        data_type: row.get(4)?,
        raw_data: parse_json(5, &raw)?,
        processed_data: parse_json(6, &processed)?,
        data_hash: row.get(7)?,
        scraped_at: parse_ts(8, &scraped_at)?,
    })
}

fn row_to_target(row: &Row<'_>) -> rusqlite::Result<CrawlTarget> {
    let rules: String = row.get(3)?;
    let last_scraped: Option<String> = row.get(4)?;
    Ok(CrawlTarget {
        id: row.get(0)?,
        name: row.get(1)?,
        base_url: row.get(2)?,
        scraping_rules: parse_json(3, &rules)?,
        last_scraped: match last_scraped {
            Some(raw) => Some(parse_ts(4, &raw)?),
            None => None,
        },
    })
}

const RECORD_COLUMNS: &str =
    "id, source_site, movie_title, year, data_type, raw_data, processed_data, data_hash, scraped_at";

impl SqliteMovieStore {
    /// Open (or create) a store at the given path
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;

            CREATE TABLE IF NOT EXISTS scrape_targets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                base_url TEXT NOT NULL,
                scraping_rules TEXT NOT NULL DEFAULT '{}',
                last_scraped TEXT
            );

            CREATE TABLE IF NOT EXISTS scraped_movie_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_site TEXT NOT NULL,
                movie_title TEXT NOT NULL,
                year INTEGER,
                data_type TEXT NOT NULL,
                raw_data TEXT NOT NULL,
                processed_data TEXT NOT NULL,
                data_hash TEXT NOT NULL,
                scraped_at TEXT NOT NULL,
                UNIQUE(source_site, movie_title, data_type, data_hash)
            );

            CREATE INDEX IF NOT EXISTS idx_movie_title
                ON scraped_movie_data(movie_title);
            CREATE INDEX IF NOT EXISTS idx_data_type
                ON scraped_movie_data(data_type);
            CREATE INDEX IF NOT EXISTS idx_scraped_at
                ON scraped_movie_data(scraped_at);

            CREATE TABLE IF NOT EXISTS scrape_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                pages_scraped INTEGER NOT NULL,
                records_extracted INTEGER NOT NULL,
                errors TEXT NOT NULL DEFAULT '[]',
                started_at TEXT NOT NULL,
                completed_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_records(
        &self,
        sql: &str,
        params: &[Box<dyn ToSql>],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(
            params_from_iter(params.iter().map(|p| p.as_ref())),
            row_to_record,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl MovieStore for SqliteMovieStore {
    fn upsert(&self, record: &RawRecord) -> Result<UpsertOutcome, StoreError> {
        if !record.is_persistable() {
            return Err(StoreError::EmptyTitle);
        }
        let hash = record.content_hash();
        let raw_json = serde_json::to_string(record)?;
        let processed: BTreeMap<String, Value> = normalize::process(record);
        let processed_json = serde_json::to_string(&processed)?;
        // normalization may clean the title (adult retail suffixes); the
        // stored title must match what lookups will ask for
        let title = processed
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&record.title)
            .to_string();
        let year = record
            .year
            .or_else(|| processed.get("year").and_then(Value::as_i64).map(|y| y as i32));
        let now = now_ts();

        // The immediate transaction holds the write lock across the probe
        // and the insert, so a second writer on the same file sees the
        // conflict path instead of a unique-constraint error.
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM scraped_movie_data
                 WHERE source_site = ?1 AND movie_title = ?2 AND data_type = ?3 AND data_hash = ?4",
                rusqlite::params![record.source_site, title, record.data_type.as_str(), hash],
                |row| row.get(0),
            )
            .optional()?;
        let id: i64 = tx.query_row(
            "INSERT INTO scraped_movie_data
             (source_site, movie_title, year, data_type, raw_data, processed_data, data_hash, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(source_site, movie_title, data_type, data_hash)
                 DO UPDATE SET scraped_at = excluded.scraped_at
             RETURNING id",
            rusqlite::params![
                record.source_site,
                title,
                year,
                record.data_type.as_str(),
                raw_json,
                processed_json,
                hash,
                now
            ],
            |row| row.get(0),
        )?;
        tx.commit()?;

        match existing {
            Some(_) => {
                debug!(id, title = %record.title, "refreshed existing record");
                Ok(UpsertOutcome::Refreshed(id))
            }
            None => {
                debug!(id, title = %record.title, data_type = %record.data_type, "inserted record");
                Ok(UpsertOutcome::Inserted(id))
            }
        }
    }

    fn find_latest(&self, query: &FallbackQuery) -> Result<Option<StoredRecord>, StoreError> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM scraped_movie_data
             WHERE LOWER(movie_title) = LOWER(?1)"
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(query.title.clone())];

        if let Some(year) = query.year {
            params.push(Box::new(year));
            sql.push_str(&format!(" AND year = ?{}", params.len()));
        }
        if !query.data_types.is_empty() {
            let placeholders: Vec<String> = query
                .data_types
                .iter()
                .map(|dt| {
                    params.push(Box::new(dt.as_str()));
                    format!("?{}", params.len())
                })
                .collect();
            sql.push_str(&format!(" AND data_type IN ({})", placeholders.join(", ")));
        }
        if !query.payload_contains_any.is_empty() {
            let clauses: Vec<String> = query
                .payload_contains_any
                .iter()
                .map(|needle| {
                    params.push(Box::new(format!("%{needle}%")));
                    format!("processed_data LIKE ?{}", params.len())
                })
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(" ORDER BY scraped_at DESC, id DESC LIMIT 1");

        Ok(self.query_records(&sql, &params)?.into_iter().next())
    }

    fn search_titles(
        &self,
        pattern: &str,
        year: Option<i32>,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        // Bare columns ride along with MAX(scraped_at), so each group yields
        // its most recent row (documented SQLite behavior).
        let mut sql = String::from(
            "SELECT id, source_site, movie_title, year, data_type, raw_data, processed_data,
                    data_hash, MAX(scraped_at) AS scraped_at
             FROM scraped_movie_data
             WHERE movie_title LIKE ?1 COLLATE NOCASE",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(format!("%{pattern}%"))];
        if let Some(year) = year {
            params.push(Box::new(year));
            sql.push_str(&format!(" AND year = ?{}", params.len()));
        }
        params.push(Box::new(limit));
        sql.push_str(&format!(
            " GROUP BY movie_title ORDER BY scraped_at DESC LIMIT ?{}",
            params.len()
        ));

        self.query_records(&sql, &params)
    }

    fn recent_highlights(
        &self,
        since_year: i32,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = "SELECT id, source_site, movie_title, year, data_type, raw_data, processed_data,
                          data_hash, MAX(scraped_at) AS scraped_at
                   FROM scraped_movie_data
                   WHERE data_type IN ('box_office', 'award', 'festival_award') AND year >= ?1
                   GROUP BY movie_title
                   ORDER BY scraped_at DESC
                   LIMIT ?2";
        let params: Vec<Box<dyn ToSql>> = vec![Box::new(since_year), Box::new(limit)];
        self.query_records(sql, &params)
    }

    fn append_log(&self, log: &CrawlLog) -> Result<(), StoreError> {
        let errors_json = serde_json::to_string(&log.errors)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scrape_logs
             (target_id, status, pages_scraped, records_extracted, errors, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                log.target_id,
                log.status.as_str(),
                log.pages_scraped,
                log.records_extracted,
                errors_json,
                format_ts(log.started_at),
                format_ts(log.completed_at)
            ],
        )?;
        Ok(())
    }

    fn touch_target(&self, target_id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE scrape_targets SET last_scraped = ?1 WHERE id = ?2",
            rusqlite::params![now_ts(), target_id],
        )?;
        if updated == 0 {
            return Err(StoreError::TargetNotFound(target_id));
        }
        Ok(())
    }

    fn load_target(&self, target_id: i64) -> Result<CrawlTarget, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, base_url, scraping_rules, last_scraped
             FROM scrape_targets WHERE id = ?1",
            rusqlite::params![target_id],
            row_to_target,
        )
        .optional()?
        .ok_or(StoreError::TargetNotFound(target_id))
    }

    fn add_target(&self, name: &str, base_url: &str, rules: &Value) -> Result<i64, StoreError> {
        let rules_json = serde_json::to_string(rules)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scrape_targets (name, base_url, scraping_rules) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, base_url, rules_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_targets(&self) -> Result<Vec<CrawlTarget>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, base_url, scraping_rules, last_scraped
             FROM scrape_targets ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_target)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn logs_for_target(&self, target_id: i64, limit: u32) -> Result<Vec<CrawlLog>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT target_id, status, pages_scraped, records_extracted, errors,
                    started_at, completed_at
             FROM scrape_logs WHERE target_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![target_id, limit], |row| {
            let status: String = row.get(1)?;
            let errors_json: String = row.get(4)?;
            let started: String = row.get(5)?;
            let completed: String = row.get(6)?;
            Ok(CrawlLog {
                target_id: row.get(0)?,
                status: CrawlStatus::parse(&status).unwrap_or(CrawlStatus::Failed),
                pages_scraped: row.get(2)?,
                records_extracted: row.get(3)?,
                errors: serde_json::from_str(&errors_json).unwrap_or_default(),
                started_at: parse_ts(5, &started)?,
                completed_at: parse_ts(6, &completed)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteMovieStore {
        SqliteMovieStore::in_memory().unwrap()
    }

    fn record(title: &str, data_type: DataType) -> RawRecord {
        RawRecord::new(data_type, title, "Film Wiki", "https://example.org/page")
    }

    fn count_records(store: &SqliteMovieStore) -> i64 {
        let conn = store.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM scraped_movie_data", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_upsert_identical_content_refreshes() {
        let store = store();
        let mut rec = record("Inception", DataType::FilmDetails);
        rec.set("director", "Christopher Nolan");

        let first = store.upsert(&rec).unwrap();
        assert!(first.is_new());

        let second = store.upsert(&rec).unwrap();
        assert!(!second.is_new());
        assert_eq!(first.id(), second.id());
        assert_eq!(count_records(&store), 1);
    }

    #[test]
    fn test_upsert_changed_content_inserts_second_row() {
        let store = store();
        let mut rec = record("Inception", DataType::FilmDetails);
        rec.set("box_office", "$829 million");
        store.upsert(&rec).unwrap();

        rec.set("box_office", "$836 million");
        let outcome = store.upsert(&rec).unwrap();
        assert!(outcome.is_new());
        assert_eq!(count_records(&store), 2);
    }

    #[test]
    fn test_upsert_rejects_empty_title() {
        let store = store();
        let rec = record("  ", DataType::General);
        assert!(matches!(store.upsert(&rec), Err(StoreError::EmptyTitle)));
    }

    #[test]
    fn test_find_latest_is_case_insensitive() {
        let store = store();
        let rec = record("The Matrix", DataType::FilmDetails).with_year(Some(1999));
        store.upsert(&rec).unwrap();

        let found = store
            .find_latest(&FallbackQuery::title("the matrix"))
            .unwrap();
        assert_eq!(found.unwrap().movie_title, "The Matrix");
    }

    #[test]
    fn test_find_latest_narrows_by_year() {
        let store = store();
        store
            .upsert(&record("Dune", DataType::FilmDetails).with_year(Some(1984)))
            .unwrap();
        store
            .upsert(&record("Dune", DataType::FilmDetails).with_year(Some(2021)))
            .unwrap();

        let found = store
            .find_latest(&FallbackQuery::title("Dune").year(Some(1984)))
            .unwrap()
            .unwrap();
        assert_eq!(found.year, Some(1984));

        let missing = store
            .find_latest(&FallbackQuery::title("Dune").year(Some(1977)))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_find_latest_prefers_most_recent() {
        let store = store();
        let mut old = record("Alien", DataType::FilmDetails);
        old.set("plot", "first pass");
        store.upsert(&old).unwrap();

        let mut newer = record("Alien", DataType::FilmDetails);
        newer.set("plot", "second pass");
        store.upsert(&newer).unwrap();

        let found = store
            .find_latest(&FallbackQuery::title("Alien"))
            .unwrap()
            .unwrap();
        assert_eq!(found.processed_str("plot"), Some("second pass"));
    }

    #[test]
    fn test_find_latest_filters_by_data_type_and_payload() {
        let store = store();
        let mut trailer = record("Heat", DataType::WikipediaContent);
        trailer.set("content", "watch at https://youtube.com/watch?v=abcdefghijk");
        store.upsert(&trailer).unwrap();
        store
            .upsert(&record("Heat", DataType::BoxOffice))
            .unwrap();

        let found = store
            .find_latest(
                &FallbackQuery::title("Heat").payload_contains_any(&["youtube", "trailer"]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.data_type, "wikipedia_content");

        let found = store
            .find_latest(&FallbackQuery::title("Heat").data_types(&[DataType::BoxOffice]))
            .unwrap()
            .unwrap();
        assert_eq!(found.data_type, "box_office");
    }

    #[test]
    fn test_search_titles_collapses_to_latest_per_title() {
        let store = store();
        let mut a = record("Blade Runner", DataType::FilmDetails);
        a.set("plot", "v1");
        store.upsert(&a).unwrap();
        let mut b = record("Blade Runner", DataType::FilmDetails);
        b.set("plot", "v2");
        store.upsert(&b).unwrap();
        store
            .upsert(&record("Blade Runner 2049", DataType::FilmDetails))
            .unwrap();

        let results = store.search_titles("blade", None, 20).unwrap();
        assert_eq!(results.len(), 2);
        let runner = results
            .iter()
            .find(|r| r.movie_title == "Blade Runner")
            .unwrap();
        assert_eq!(runner.processed_str("plot"), Some("v2"));
    }

    #[test]
    fn test_recent_highlights_filters_types_and_year() {
        let store = store();
        store
            .upsert(&record("Old Hit", DataType::BoxOffice).with_year(Some(1990)))
            .unwrap();
        store
            .upsert(&record("New Hit", DataType::BoxOffice).with_year(Some(2025)))
            .unwrap();
        store
            .upsert(&record("New Detail", DataType::FilmDetails).with_year(Some(2025)))
            .unwrap();

        let results = store.recent_highlights(2024, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].movie_title, "New Hit");
    }

    #[test]
    fn test_target_lifecycle() {
        let store = store();
        let rules = serde_json::json!({"max_pages": 10});
        let id = store
            .add_target("Film Wiki", "https://example.org", &rules)
            .unwrap();

        let target = store.load_target(id).unwrap();
        assert_eq!(target.name, "Film Wiki");
        assert!(target.last_scraped.is_none());

        store.touch_target(id).unwrap();
        let target = store.load_target(id).unwrap();
        assert!(target.last_scraped.is_some());

        assert!(matches!(
            store.load_target(999),
            Err(StoreError::TargetNotFound(999))
        ));
        assert!(matches!(
            store.touch_target(999),
            Err(StoreError::TargetNotFound(999))
        ));
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.db");
        {
            let store = SqliteMovieStore::new(&path).unwrap();
            store
                .upsert(&record("Stalker", DataType::FilmDetails).with_year(Some(1979)))
                .unwrap();
        }
        let store = SqliteMovieStore::new(&path).unwrap();
        let found = store
            .find_latest(&FallbackQuery::title("Stalker"))
            .unwrap()
            .unwrap();
        assert_eq!(found.year, Some(1979));
    }

    #[test]
    fn test_upsert_from_second_connection_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.db");
        let writer_a = SqliteMovieStore::new(&path).unwrap();
        let writer_b = SqliteMovieStore::new(&path).unwrap();

        let mut rec = record("Solaris", DataType::FilmDetails).with_year(Some(1972));
        rec.set("director", "Andrei Tarkovsky");

        let first = writer_a.upsert(&rec).unwrap();
        assert!(first.is_new());

        // the second connection never saw the row; it must refresh, not
        // surface a unique-constraint error
        let second = writer_b.upsert(&rec).unwrap();
        assert!(!second.is_new());
        assert_eq!(second.id(), first.id());
        assert_eq!(count_records(&writer_a), 1);
    }

    #[test]
    fn test_log_round_trip() {
        let store = store();
        let id = store
            .add_target("Film Wiki", "https://example.org", &serde_json::json!({}))
            .unwrap();
        let log = CrawlLog {
            target_id: id,
            status: CrawlStatus::Failed,
            pages_scraped: 1,
            records_extracted: 0,
            errors: vec!["fetch error: request timed out".into()],
            started_at: Utc::now(),
            completed_at: Utc::now(),
        };
        store.append_log(&log).unwrap();

        let logs = store.logs_for_target(id, 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, CrawlStatus::Failed);
        assert_eq!(logs[0].errors.len(), 1);
    }
}
