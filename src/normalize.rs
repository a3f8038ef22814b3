//! Text normalization applied between extraction and persistence
//!
//! Raw field values are kept verbatim in `raw_data`; everything here only
//! feeds the `processed_data` payload. Parsers return `None` on input they
//! cannot interpret, never an error.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::models::{DataType, RawRecord};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace regex");
    static ref MONEY_AMOUNT: Regex = Regex::new(r"[\d,]+\.?\d*").expect("money regex");
    static ref RUNTIME_MINUTES: Regex = Regex::new(r"(\d+)\s*min").expect("runtime regex");
    static ref PRICE_AMOUNT: Regex = Regex::new(r"[$£€¥]?(\d+\.?\d*)").expect("price regex");
    static ref YEAR: Regex = Regex::new(r"\b((?:19|20)\d{2})\b").expect("year regex");
    static ref ADULT_TITLE_SUFFIX: Regex =
        Regex::new(r"\s*-\s*(DVD|Blu-ray|4K).*$").expect("title suffix regex");
}

/// Free-text fields that get whitespace collapsed
const TEXT_FIELDS: &[&str] = &["plot", "content", "director", "cast", "producer", "writer"];

/// Money-valued fields that get a `*_numeric` companion
const MONEY_FIELDS: &[&str] = &["box_office", "budget"];

/// Collapse runs of whitespace (including newlines) to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Parse a money string like "$2.2 billion" or "$12,000,000" into a float
///
/// `million`/`billion` suffixes scale the first numeric group found.
pub fn parse_money(text: &str) -> Option<f64> {
    let amount = MONEY_AMOUNT.find(text)?;
    let number: f64 = amount.as_str().replace(',', "").parse().ok()?;
    let lowered = text.to_lowercase();
    if lowered.contains("billion") {
        Some(number * 1_000_000_000.0)
    } else if lowered.contains("million") {
        Some(number * 1_000_000.0)
    } else {
        Some(number)
    }
}

/// Parse "142 min" (and variants) into whole minutes
pub fn parse_runtime_minutes(text: &str) -> Option<i64> {
    RUNTIME_MINUTES
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a retail price like "$29.99" into a float
pub fn parse_price(text: &str) -> Option<f64> {
    PRICE_AMOUNT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First plausible 4-digit year (1900-2099) in the text
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Strip retail format suffixes ("- DVD", "- Blu-ray Special Edition", ...)
pub fn clean_adult_title(title: &str) -> String {
    let collapsed = collapse_whitespace(title);
    ADULT_TITLE_SUFFIX.replace(&collapsed, "").into_owned()
}

fn collapse_field(fields: &mut BTreeMap<String, Value>, key: &str) {
    if let Some(Value::String(s)) = fields.get(key) {
        let cleaned = collapse_whitespace(s);
        fields.insert(key.to_string(), Value::from(cleaned));
    }
}

/// Build the `processed_data` payload for a record
///
/// Every raw field is carried over; derived values (`*_numeric`,
/// `runtime_minutes`, cleaned titles, adult markers) are layered on top.
pub fn process(record: &RawRecord) -> BTreeMap<String, Value> {
    let mut out = record.fields.clone();
    out.insert("title".into(), Value::from(record.title.as_str()));
    if let Some(year) = record.year {
        out.insert("year".into(), Value::from(year));
    }

    for key in TEXT_FIELDS {
        collapse_field(&mut out, key);
    }

    for key in MONEY_FIELDS {
        if let Some(Value::String(s)) = out.get(*key) {
            if let Some(numeric) = parse_money(s) {
                out.insert(format!("{key}_numeric"), Value::from(numeric));
            }
        }
    }

    if let Some(Value::String(s)) = out.get("runtime") {
        if let Some(minutes) = parse_runtime_minutes(s) {
            out.insert("runtime_minutes".into(), Value::from(minutes));
        }
    }

    if record.year.is_none() {
        let from_release = out
            .get("release_date")
            .and_then(Value::as_str)
            .and_then(extract_year);
        if let Some(year) = from_release.or_else(|| extract_year(&record.title)) {
            out.insert("year".into(), Value::from(year));
        }
    }

    if record.data_type == DataType::AdultContent {
        let cleaned = clean_adult_title(&record.title);
        out.insert("title".into(), Value::from(cleaned));
        out.insert("age_restriction".into(), Value::from("18+"));
        out.insert(
            "content_warning".into(),
            Value::from("Adult content - 18+ only"),
        );
        if let Some(Value::String(s)) = out.get("price") {
            if let Some(numeric) = parse_price(s) {
                out.insert("price_numeric".into(), Value::from(numeric));
            }
        }
    }

    out
}
