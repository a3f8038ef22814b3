//! Extractors for age-restricted retail catalogs
//!
//! Retail sites have no shared markup, so each known retailer gets its own
//! tile heuristics, with a generic catalog walker as the fallback. Every
//! record produced here is tagged `18+` at extraction time; normalization
//! adds the content warning on top.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{DataType, RawRecord};
use crate::normalize::extract_year;
use crate::scraper::dom::{absolute_url, find_descendant, selector, text_of};

/// Per-catalog record cap for the named retailers
pub const MAX_CATALOG_ITEMS: usize = 50;
/// Tighter cap for the generic fallback walker
pub const MAX_GENERIC_ITEMS: usize = 20;

/// Navigation chrome that looks like a title but is not one
const TITLE_REJECTS: &[&str] = &["more", "view", "buy"];

lazy_static! {
    static ref PRODUCT_TILES: Selector = selector!(
        r#"div[class*="product"], div[class*="item"], article[class*="product"], article[class*="item"]"#
    );
    static ref STOREFRONT_TILES: Selector = selector!(
        r#".product-item, .product-card, .featured-product, .collection-item, [class*="product"]"#
    );
    static ref CATALOG_TILES: Selector = selector!(
        r#"div[class*="movie"], div[class*="film"], div[class*="product"], div[class*="item"],
           li[class*="movie"], li[class*="film"], li[class*="product"], li[class*="item"],
           article[class*="movie"], article[class*="film"], article[class*="product"], article[class*="item"]"#
    );
    static ref CURATED_TILES: Selector = selector!(
        r#"div[class*="collection"], div[class*="product"], div[class*="pick"],
           article[class*="collection"], article[class*="product"], article[class*="pick"],
           section[class*="collection"], section[class*="product"], section[class*="pick"]"#
    );
    static ref GENERIC_TILES: Selector = selector!(
        r#"div[class*="product"], div[class*="movie"], div[class*="film"], div[class*="item"],
           div[class*="card"], article[class*="product"], article[class*="movie"],
           article[class*="film"], article[class*="item"], article[class*="card"],
           li[class*="product"], li[class*="movie"], li[class*="film"], li[class*="item"],
           li[class*="card"]"#
    );
    static ref ANCHOR: Selector = selector!("a");
    static ref IMG: Selector = selector!("img[src]");
    static ref MEDIA_FORMAT: Regex = Regex::new(r"(?i)\b(blu-?ray|dvd|4k)\b").expect("format regex");
}

/// Known retailers with dedicated tile heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdultSite {
    SomethingWeird,
    VinegarSyndrome,
    KimchiDvd,
    MovieRoom,
    Generic,
}

impl AdultSite {
    /// Match a target name to a retailer; unknown names get the generic walker
    pub fn from_target_name(name: &str) -> Self {
        let lowered = name.to_lowercase();
        if lowered.contains("something weird") {
            Self::SomethingWeird
        } else if lowered.contains("vinegar syndrome") {
            Self::VinegarSyndrome
        } else if lowered.contains("kimchi") {
            Self::KimchiDvd
        } else if lowered.contains("movie room") {
            Self::MovieRoom
        } else {
            Self::Generic
        }
    }

    pub fn extract(&self, doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
        match self {
            Self::SomethingWeird => extract_something_weird(doc, site, url),
            Self::VinegarSyndrome => extract_vinegar_syndrome(doc, site, url),
            Self::KimchiDvd => extract_kimchi_dvd(doc, site, url),
            Self::MovieRoom => extract_movie_room(doc, site, url),
            Self::Generic => extract_generic_catalog(doc, site, url),
        }
    }
}

fn plausible_title(title: &str, min_len: usize) -> bool {
    title.len() >= min_len && !TITLE_REJECTS.contains(&title.to_lowercase().as_str())
}

fn new_record(title: String, site: &str, url: &str, tile_text: &str) -> RawRecord {
    let year = extract_year(&title).or_else(|| extract_year(tile_text));
    let mut record = RawRecord::new(DataType::AdultContent, title, site, url).with_year(year);
    record.set("age_restriction", "18+");
    record
}

fn set_text_field(
    record: &mut RawRecord,
    tile: ElementRef<'_>,
    key: &str,
    tags: &[&str],
    hints: &[&str],
    max_len: usize,
) {
    if let Some(el) = find_descendant(tile, tags, hints) {
        let text: String = text_of(el).chars().take(max_len).collect();
        if !text.is_empty() {
            record.set(key, text);
        }
    }
}

fn extract_something_weird(doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for tile in doc.select(&PRODUCT_TILES) {
        if out.len() >= MAX_CATALOG_ITEMS {
            break;
        }
        let Some(title_el) =
            find_descendant(tile, &["h1", "h2", "h3", "a"], &["title", "name", "product"])
        else {
            continue;
        };
        let title = text_of(title_el);
        if !plausible_title(&title, 3) {
            continue;
        }
        let tile_text = text_of(tile);
        let mut record = new_record(title, site, url, &tile_text);
        set_text_field(&mut record, tile, "price", &["span", "div"], &["price", "cost"], 50);
        set_text_field(
            &mut record,
            tile,
            "description",
            &["p", "div"],
            &["description", "summary"],
            500,
        );
        if let Some(img) = tile.select(&IMG).next() {
            if let Some(abs) = img
                .value()
                .attr("src")
                .and_then(|src| absolute_url(url, src))
            {
                record.set("image_url", abs);
            }
        }
        out.push(record);
    }
    out
}

fn extract_vinegar_syndrome(doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tile in doc.select(&STOREFRONT_TILES) {
        if out.len() >= MAX_CATALOG_ITEMS {
            break;
        }
        if !seen.insert(tile.id()) {
            continue;
        }
        let title_el = find_descendant(tile, &["h2", "h3", "h4", "a"], &["title", "name"])
            .or_else(|| tile.select(&ANCHOR).next());
        let Some(title_el) = title_el else {
            continue;
        };
        let title = text_of(title_el);
        if !plausible_title(&title, 3) {
            continue;
        }
        let tile_text = text_of(tile);
        let mut record = new_record(title, site, url, &tile_text);
        if let Some(format) = MEDIA_FORMAT.find(&tile_text) {
            record.set("format", format.as_str());
        }
        set_text_field(
            &mut record,
            tile,
            "director",
            &["span", "div", "p"],
            &["director"],
            100,
        );
        set_text_field(&mut record, tile, "price", &["span", "div"], &["price", "cost"], 50);
        out.push(record);
    }
    out
}

fn extract_kimchi_dvd(doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for tile in doc.select(&CATALOG_TILES) {
        if out.len() >= MAX_CATALOG_ITEMS {
            break;
        }
        let title_el = find_descendant(tile, &["h1", "h2", "h3"], &["title", "name"])
            .or_else(|| tile.select(&ANCHOR).next());
        let Some(title_el) = title_el else {
            continue;
        };
        let title = text_of(title_el);
        if title.len() < 2 {
            continue;
        }
        let tile_text = text_of(tile);
        let mut record = new_record(title, site, url, &tile_text);
        record.set("region", "Asia");
        set_text_field(
            &mut record,
            tile,
            "country",
            &["span", "div"],
            &["country", "origin", "region"],
            50,
        );
        set_text_field(
            &mut record,
            tile,
            "director",
            &["span", "div", "p"],
            &["director"],
            100,
        );
        out.push(record);
    }
    out
}

fn extract_movie_room(doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for tile in doc.select(&CURATED_TILES) {
        if out.len() >= MAX_CATALOG_ITEMS {
            break;
        }
        let title_el = find_descendant(tile, &["h2", "h3", "h4"], &[])
            .or_else(|| tile.select(&ANCHOR).next());
        let Some(title_el) = title_el else {
            continue;
        };
        let title = text_of(title_el);
        if !plausible_title(&title, 3) {
            continue;
        }
        let tile_text = text_of(tile);
        let mut record = new_record(title, site, url, &tile_text);
        set_text_field(
            &mut record,
            tile,
            "curator_note",
            &["p", "div", "span"],
            &["note", "comment", "recommendation"],
            300,
        );
        set_text_field(
            &mut record,
            tile,
            "genre",
            &["span", "div"],
            &["genre", "category"],
            50,
        );
        set_text_field(
            &mut record,
            tile,
            "staff_rating",
            &["span", "div"],
            &["rating", "score"],
            20,
        );
        out.push(record);
    }
    out
}

fn extract_generic_catalog(doc: &Html, site: &str, url: &str) -> Vec<RawRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tile in doc.select(&GENERIC_TILES) {
        if out.len() >= MAX_GENERIC_ITEMS {
            break;
        }
        if !seen.insert(tile.id()) {
            continue;
        }
        let title_el = find_descendant(tile, &["h1", "h2", "h3", "h4"], &[])
            .or_else(|| tile.select(&ANCHOR).next())
            .or_else(|| find_descendant(tile, &["span", "div", "p"], &["title", "name"]));
        let Some(title_el) = title_el else {
            continue;
        };
        let title = text_of(title_el);
        if !plausible_title(&title, 3) {
            continue;
        }
        let tile_text = text_of(tile);
        let mut record = new_record(title, site, url, &tile_text);
        set_text_field(&mut record, tile, "price", &["span", "div"], &["price", "cost"], 50);
        out.push(record);
    }
    out
}
