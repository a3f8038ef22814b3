//! Extractors for MediaWiki-style film pages
//!
//! Each function is a pure per-page transform from a parsed document to
//! records (or follow links). The runner decides which pages to fetch and
//! in what order; nothing here performs I/O.

use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::models::{DataType, RawRecord};
use crate::normalize::extract_year;
use crate::scraper::dom::{absolute_url, selector, text_of};

lazy_static! {
    static ref CONTENT_HEADINGS: Selector = selector!("#mw-content-text h2, #mw-content-text h3");
    static ref CONTENT_LINKS: Selector = selector!("#mw-content-text a[href]");
    static ref FIRST_HEADING: Selector = selector!("h1.firstHeading");
    static ref H1: Selector = selector!("h1");
    static ref H2: Selector = selector!("h2");
    static ref INFOBOX: Selector = selector!("table.infobox");
    static ref WIKITABLE: Selector = selector!("table.wikitable");
    static ref TR: Selector = selector!("tr");
    static ref TH: Selector = selector!("th");
    static ref TD: Selector = selector!("td");
    static ref CELL: Selector = selector!("td, th");
    static ref LINK: Selector = selector!("a[href]");
    static ref PARAGRAPH: Selector = selector!("p");
    static ref LIST_ITEM: Selector = selector!("li");
}

/// Infobox labels matched by substring, mapped to record field names
const INFOBOX_FIELDS: &[(&str, &str)] = &[
    ("Direct", "director"),
    ("Writ", "writer"),
    ("Star", "cast"),
    ("Cast", "cast"),
    ("Release", "release_date"),
    ("Box office", "box_office"),
    ("Budget", "budget"),
    ("Running time", "runtime"),
    ("Country", "country"),
    ("Language", "language"),
];

/// Section headings on festival pages worth harvesting
const FESTIVAL_KEYWORDS: &[&str] = &["Palme", "Prize", "Award", "Winner"];

fn page_title(doc: &Html) -> Option<String> {
    doc.select(&FIRST_HEADING)
        .next()
        .or_else(|| doc.select(&H1).next())
        .map(text_of)
        .filter(|t| !t.is_empty())
}

fn heading_title(heading: ElementRef<'_>) -> String {
    text_of(heading).replace("[edit]", "").trim().to_string()
}

fn is_heading(el: ElementRef<'_>) -> bool {
    matches!(el.value().name(), "h2" | "h3")
}

/// Sibling elements after a heading, up to (not including) the next heading
fn section_elements<'a>(heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut out = Vec::new();
    for node in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if is_heading(el) {
            break;
        }
        out.push(el);
    }
    out
}

/// Hub page strategy: harvest each heading's paragraphs into one record
pub fn extract_overview(doc: &Html, site: &str, url: &str) -> RawRecord {
    let mut sections = Map::new();
    for heading in doc.select(&CONTENT_HEADINGS) {
        let title = heading_title(heading);
        if title.is_empty() {
            continue;
        }
        let text: Vec<String> = section_elements(heading)
            .into_iter()
            .filter(|el| el.value().name() == "p")
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect();
        if !text.is_empty() {
            sections.insert(title, Value::from(text.join(" ")));
        }
    }

    let mut record = RawRecord::new(DataType::FilmOverview, "Film Overview", site, url);
    record.set("sections", Value::Object(sections));
    record
}

/// Internal links on a hub page whose anchor text suggests a film article
pub fn extract_film_links(doc: &Html, page_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for link in doc.select(&CONTENT_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.starts_with("/wiki/") || href.contains(':') {
            continue;
        }
        let text = text_of(link).to_lowercase();
        if !(text.contains("film") || text.contains("movie") || text.contains("cinema")) {
            continue;
        }
        if let Some(abs) = absolute_url(page_url, href) {
            if seen.insert(abs.clone()) {
                out.push(abs);
            }
        }
    }
    out
}

/// Film article strategy: title from the page heading, fields from the
/// infobox, plot from the first paragraphs of the Plot section
pub fn extract_film_details(doc: &Html, site: &str, url: &str) -> Option<RawRecord> {
    let title = page_title(doc)?;
    let mut record = RawRecord::new(DataType::FilmDetails, title, site, url);

    if let Some(infobox) = doc.select(&INFOBOX).next() {
        for row in infobox.select(&TR) {
            let Some(label_el) = row.select(&TH).next() else {
                continue;
            };
            let Some(value_el) = row.select(&TD).next() else {
                continue;
            };
            let label = text_of(label_el);
            let value = text_of(value_el);
            if label.is_empty() || value.is_empty() {
                continue;
            }
            // production companies share the "Produc" stem with producers
            if label.contains("Produc") && !label.to_lowercase().contains("company") {
                record.set("producer", value.clone());
                continue;
            }
            for (needle, field) in INFOBOX_FIELDS {
                if label.contains(needle) {
                    record.set(*field, value.clone());
                    if *field == "release_date" {
                        record.year = extract_year(&value);
                    }
                    break;
                }
            }
        }
    }

    if let Some(plot_heading) = doc
        .select(&H2)
        .find(|h| text_of(*h).contains("Plot"))
    {
        let paragraphs: Vec<String> = section_elements(plot_heading)
            .into_iter()
            .filter(|el| el.value().name() == "p")
            .map(text_of)
            .filter(|t| !t.is_empty())
            .take(3)
            .collect();
        if !paragraphs.is_empty() {
            record.set("plot", paragraphs.join(" "));
        }
    }

    Some(record)
}

/// Box-office table strategy: zip header names with row cells
///
/// Cell values are kept verbatim under their header names; cells carrying a
/// link additionally get a `<Header>_link` field with the absolute URL.
pub fn extract_box_office(doc: &Html, site: &str, page_url: &str) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for table in doc.select(&WIKITABLE) {
        let rows: Vec<ElementRef<'_>> = table.select(&TR).collect();
        if rows.len() < 2 {
            continue;
        }
        let headers: Vec<String> = rows[0].select(&CELL).map(text_of).collect();

        for row in &rows[1..] {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            if cells.len() < 2 {
                continue;
            }
            let mut record = RawRecord::new(DataType::BoxOffice, "", site, page_url);
            for (i, cell) in cells.iter().enumerate() {
                let Some(header) = headers.get(i).filter(|h| !h.is_empty()) else {
                    continue;
                };
                record.set(header.clone(), text_of(*cell));
                if let Some(link) = cell.select(&LINK).next() {
                    if let Some(abs) = link
                        .value()
                        .attr("href")
                        .and_then(|href| absolute_url(page_url, href))
                    {
                        record.set(format!("{header}_link"), abs);
                    }
                }
            }
            let Some(title) = record
                .get_str("Film")
                .or_else(|| record.get_str("Title"))
                .map(str::to_string)
                .filter(|t| !t.is_empty())
            else {
                continue;
            };
            record.title = title;
            record.year = extract_year(&text_of(*row));
            out.push(record);
        }
    }
    out
}

/// Academy Awards strategy: year in the first cell, winner link in the second
pub fn extract_awards(doc: &Html, site: &str, page_url: &str) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for table in doc.select(&WIKITABLE) {
        let rows: Vec<ElementRef<'_>> = table.select(&TR).collect();
        for row in rows.iter().skip(1) {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            if cells.len() < 2 {
                continue;
            }
            let year = extract_year(&text_of(cells[0]));
            let Some(link) = cells[1].select(&LINK).next() else {
                continue;
            };
            let title = text_of(link);
            if title.is_empty() {
                continue;
            }
            let mut record =
                RawRecord::new(DataType::Award, title, site, page_url).with_year(year);
            record.set("award", "Academy Award for Best Picture");
            record.set("category", "Winner");
            if let Some(abs) = link
                .value()
                .attr("href")
                .and_then(|href| absolute_url(page_url, href))
            {
                record.set("wikipedia_link", abs);
            }
            out.push(record);
        }
    }
    out
}

/// Festival strategy: harvest tables and lists under award-related headings
pub fn extract_festival(doc: &Html, site: &str, page_url: &str) -> Vec<RawRecord> {
    let festival = page_title(doc).unwrap_or_else(|| "Film Festival".to_string());
    let mut out = Vec::new();

    for heading in doc.select(&CONTENT_HEADINGS) {
        let section = heading_title(heading);
        if !FESTIVAL_KEYWORDS.iter().any(|k| section.contains(k)) {
            continue;
        }
        for el in section_elements(heading) {
            match el.value().name() {
                "table" => {
                    let rows: Vec<ElementRef<'_>> = el.select(&TR).collect();
                    for row in rows.iter().skip(1) {
                        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
                        if cells.is_empty() {
                            continue;
                        }
                        let year = extract_year(&text_of(cells[0]));
                        let film_cell = if cells.len() > 1 { cells[1] } else { cells[0] };
                        let Some(link) = film_cell.select(&LINK).next() else {
                            continue;
                        };
                        if let Some(record) =
                            festival_record(link, &festival, &section, year, site, page_url)
                        {
                            out.push(record);
                        }
                    }
                }
                "ul" | "ol" => {
                    for item in el.select(&LIST_ITEM) {
                        let year = extract_year(&text_of(item));
                        let Some(link) = item.select(&LINK).next() else {
                            continue;
                        };
                        if let Some(record) =
                            festival_record(link, &festival, &section, year, site, page_url)
                        {
                            out.push(record);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    out
}

fn festival_record(
    link: ElementRef<'_>,
    festival: &str,
    section: &str,
    year: Option<i32>,
    site: &str,
    page_url: &str,
) -> Option<RawRecord> {
    let title = text_of(link);
    if title.is_empty() {
        return None;
    }
    let mut record =
        RawRecord::new(DataType::FestivalAward, title, site, page_url).with_year(year);
    record.set("festival", festival);
    record.set("award", section);
    if let Some(abs) = link
        .value()
        .attr("href")
        .and_then(|href| absolute_url(page_url, href))
    {
        record.set("wikipedia_link", abs);
    }
    Some(record)
}

/// Links to "List of ..." articles, with their anchor text
pub fn extract_list_links(doc: &Html, page_url: &str) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for link in doc.select(&CONTENT_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains("/wiki/List_of_") {
            continue;
        }
        let text = text_of(link);
        if text.is_empty() {
            continue;
        }
        if let Some(abs) = absolute_url(page_url, href) {
            if seen.insert(abs.clone()) {
                out.push((abs, text));
            }
        }
    }
    out
}

/// Entries of one "List of ..." page, capped at `max_entries`
pub fn extract_list_entries(
    doc: &Html,
    site: &str,
    page_url: &str,
    list_name: &str,
    max_entries: usize,
) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for table in doc.select(&WIKITABLE) {
        let rows: Vec<ElementRef<'_>> = table.select(&TR).collect();
        for row in rows.iter().skip(1) {
            let row_text = text_of(*row);
            for cell in row.select(&CELL) {
                let Some(link) = cell
                    .select(&LINK)
                    .find(|l| l.value().attr("href").is_some_and(|h| h.starts_with("/wiki/")))
                else {
                    continue;
                };
                let title = text_of(link);
                if title.is_empty() || title.starts_with("List") {
                    continue;
                }
                let mut record = RawRecord::new(DataType::FilmListEntry, title, site, page_url)
                    .with_year(extract_year(&row_text));
                record.set("list_name", list_name);
                if let Some(abs) = link
                    .value()
                    .attr("href")
                    .and_then(|href| absolute_url(page_url, href))
                {
                    record.set("wikipedia_link", abs);
                }
                out.push(record);
                if out.len() >= max_entries {
                    return out;
                }
            }
        }
    }
    out
}

/// Fallback strategy for pages no other extractor recognizes
pub fn extract_generic(doc: &Html, site: &str, url: &str) -> RawRecord {
    let title = page_title(doc).unwrap_or_else(|| "Unknown".to_string());
    let content: String = doc
        .select(&PARAGRAPH)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(2000)
        .collect();

    let mut record = RawRecord::new(DataType::WikipediaContent, title, site, url);
    record.set("content", content);
    record
}
