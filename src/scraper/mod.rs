//! Crawl orchestration
//!
//! A [`CrawlRunner`] drives one pass over one configured target: pick the
//! extraction strategy from the target, fetch pages with polite delays,
//! extract records, persist them, and leave exactly one audit log row
//! behind whatever happens.

pub mod adult;
mod dom;
pub mod fetcher;
pub mod rate;
pub mod wikipedia;

use std::time::Instant;

use chrono::Utc;
use scraper::Html;
use tracing::{debug, error, info, warn};

pub use adult::AdultSite;
pub use fetcher::PageFetcher;
pub use rate::DelayPolicy;

use crate::error::{Error, Result};
use crate::models::{CrawlLog, CrawlStatus, CrawlTarget, RawRecord, RunReport};
use crate::storage::SharedMovieStore;

/// Follow at most this many film links from a hub page
pub const MAX_HUB_LINKS: usize = 10;
/// Visit at most this many "List of ..." pages per pass
pub const MAX_LISTS: usize = 20;
/// Keep at most this many entries per list page
pub const MAX_LIST_ENTRIES: usize = 50;

/// How a target's pages get turned into records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Overview plus follow-up film detail pages
    FilmHub,
    /// "List of ..." index plus the lists themselves
    FilmLists,
    BoxOffice,
    AcademyAwards,
    FilmFestival,
    /// Single-page fallback for unrecognized wiki targets
    GenericWikipedia,
    AdultCatalog(AdultSite),
}

impl Strategy {
    /// Pick the strategy for a target from its name and scraping rules
    ///
    /// Known retailer names and any target marked age-restricted route to
    /// the adult catalog strategies; those refuse to construct unless the
    /// rules explicitly carry `age_restriction: "18+"`.
    pub fn for_target(target: &CrawlTarget) -> Result<Self> {
        let name = target.name.to_lowercase();
        let retailer = ["something weird", "vinegar syndrome", "kimchi", "movie room"]
            .iter()
            .any(|n| name.contains(n));

        if retailer || target.is_age_restricted() {
            if !target.is_age_restricted() {
                return Err(Error::config(format!(
                    "target '{}' looks age-restricted but its rules lack age_restriction \"18+\"",
                    target.name
                )));
            }
            return Ok(Self::AdultCatalog(AdultSite::from_target_name(&target.name)));
        }

        if name.contains("hub") || name.contains("portal") {
            Ok(Self::FilmHub)
        } else if name.contains("list") {
            Ok(Self::FilmLists)
        } else if name.contains("box office") {
            Ok(Self::BoxOffice)
        } else if name.contains("academy award") || name.contains("oscar") {
            Ok(Self::AcademyAwards)
        } else if name.contains("festival") {
            Ok(Self::FilmFestival)
        } else {
            Ok(Self::GenericWikipedia)
        }
    }
}

#[derive(Default)]
struct PassState {
    pages_scraped: u32,
    records_extracted: u32,
    errors: Vec<String>,
}

/// Runs one crawl pass over one target
pub struct CrawlRunner {
    store: SharedMovieStore,
    fetcher: PageFetcher,
    delay: DelayPolicy,
    target: CrawlTarget,
    strategy: Strategy,
}

impl CrawlRunner {
    /// Load the target and resolve its strategy; both are fatal if missing
    pub fn new(
        store: SharedMovieStore,
        fetcher: PageFetcher,
        delay: DelayPolicy,
        target_id: i64,
    ) -> Result<Self> {
        let target = store.load_target(target_id)?;
        let strategy = Strategy::for_target(&target)?;
        info!(target = %target.name, ?strategy, "crawl runner ready");
        Ok(Self {
            store,
            fetcher,
            delay,
            target,
            strategy,
        })
    }

    pub fn target(&self) -> &CrawlTarget {
        &self.target
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Execute one pass
    ///
    /// Never fails: any error ends the pass with a `failed` log row and is
    /// reported through the returned [`RunReport`]. `last_scraped` is only
    /// touched on success.
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut pass = PassState::default();

        let status = match self.execute(&mut pass).await {
            Ok(()) => CrawlStatus::Success,
            Err(e) => {
                error!(target = %self.target.name, error = %e, "crawl pass failed");
                pass.errors.push(e.to_string());
                CrawlStatus::Failed
            }
        };

        let log = CrawlLog {
            target_id: self.target.id,
            status,
            pages_scraped: pass.pages_scraped,
            records_extracted: pass.records_extracted,
            errors: pass.errors.clone(),
            started_at,
            completed_at: Utc::now(),
        };
        if let Err(e) = self.store.append_log(&log) {
            error!(target = %self.target.name, error = %e, "failed to append crawl log");
        }
        if status == CrawlStatus::Success {
            if let Err(e) = self.store.touch_target(self.target.id) {
                error!(target = %self.target.name, error = %e, "failed to update last_scraped");
            }
        }

        info!(
            target = %self.target.name,
            status = status.as_str(),
            pages = pass.pages_scraped,
            records = pass.records_extracted,
            errors = pass.errors.len(),
            "crawl pass finished"
        );

        RunReport {
            target_name: self.target.name.clone(),
            status,
            pages_scraped: pass.pages_scraped,
            records_extracted: pass.records_extracted,
            errors: pass.errors,
            duration_secs: timer.elapsed().as_secs_f64(),
        }
    }

    async fn execute(&self, pass: &mut PassState) -> Result<()> {
        let site = self.target.name.as_str();
        let base = self.target.base_url.as_str();

        match self.strategy {
            Strategy::FilmHub => {
                let html = self.fetch_page(base, pass).await?;
                let (overview, links) = {
                    let doc = Html::parse_document(&html);
                    (
                        wikipedia::extract_overview(&doc, site, base),
                        wikipedia::extract_film_links(&doc, base),
                    )
                };
                self.save(pass, overview);

                // secondary page failures degrade the pass, they don't end it
                for link in links.into_iter().take(MAX_HUB_LINKS) {
                    match self.fetch_page(&link, pass).await {
                        Ok(html) => {
                            let record = {
                                let doc = Html::parse_document(&html);
                                wikipedia::extract_film_details(&doc, site, &link)
                            };
                            if let Some(record) = record {
                                self.save(pass, record);
                            }
                        }
                        Err(e) => {
                            warn!(url = %link, error = %e, "film page fetch failed");
                            pass.errors.push(format!("{link}: {e}"));
                        }
                    }
                }
            }
            Strategy::FilmLists => {
                let html = self.fetch_page(base, pass).await?;
                let lists = {
                    let doc = Html::parse_document(&html);
                    wikipedia::extract_list_links(&doc, base)
                };
                for (link, list_name) in lists.into_iter().take(MAX_LISTS) {
                    match self.fetch_page(&link, pass).await {
                        Ok(html) => {
                            let records = {
                                let doc = Html::parse_document(&html);
                                wikipedia::extract_list_entries(
                                    &doc,
                                    site,
                                    &link,
                                    &list_name,
                                    MAX_LIST_ENTRIES,
                                )
                            };
                            for record in records {
                                self.save(pass, record);
                            }
                        }
                        Err(e) => {
                            warn!(url = %link, error = %e, "list page fetch failed");
                            pass.errors.push(format!("{link}: {e}"));
                        }
                    }
                }
            }
            Strategy::BoxOffice => {
                let html = self.fetch_page(base, pass).await?;
                let records = {
                    let doc = Html::parse_document(&html);
                    wikipedia::extract_box_office(&doc, site, base)
                };
                for record in records {
                    self.save(pass, record);
                }
            }
            Strategy::AcademyAwards => {
                let html = self.fetch_page(base, pass).await?;
                let records = {
                    let doc = Html::parse_document(&html);
                    wikipedia::extract_awards(&doc, site, base)
                };
                for record in records {
                    self.save(pass, record);
                }
            }
            Strategy::FilmFestival => {
                let html = self.fetch_page(base, pass).await?;
                let records = {
                    let doc = Html::parse_document(&html);
                    wikipedia::extract_festival(&doc, site, base)
                };
                for record in records {
                    self.save(pass, record);
                }
            }
            Strategy::GenericWikipedia => {
                let html = self.fetch_page(base, pass).await?;
                let record = {
                    let doc = Html::parse_document(&html);
                    wikipedia::extract_generic(&doc, site, base)
                };
                self.save(pass, record);
            }
            Strategy::AdultCatalog(adult_site) => {
                let html = self.fetch_page(base, pass).await?;
                let records = {
                    let doc = Html::parse_document(&html);
                    adult_site.extract(&doc, site, base)
                };
                for record in records {
                    self.save(pass, record);
                }
            }
        }
        Ok(())
    }

    /// Wait out the delay, then fetch; successful fetches count as pages
    async fn fetch_page(&self, url: &str, pass: &mut PassState) -> Result<String> {
        self.delay.wait().await;
        let html = self.fetcher.fetch(url).await?;
        pass.pages_scraped += 1;
        Ok(html)
    }

    /// Persist one record; failures are recorded, never fatal
    fn save(&self, pass: &mut PassState, record: RawRecord) {
        if !record.is_persistable() {
            debug!(url = %record.url, "skipping record without title");
            return;
        }
        match self.store.upsert(&record) {
            Ok(_) => pass.records_extracted += 1,
            Err(e) => {
                warn!(title = %record.title, error = %e, "failed to persist record");
                pass.errors.push(format!("{}: {e}", record.title));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target(name: &str, rules: serde_json::Value) -> CrawlTarget {
        CrawlTarget {
            id: 1,
            name: name.to_string(),
            base_url: "https://example.org".to_string(),
            scraping_rules: rules,
            last_scraped: None,
        }
    }

    #[test]
    fn test_strategy_by_target_name() {
        let cases = [
            ("Wikipedia Film Portal", Strategy::FilmHub),
            ("Film Hub", Strategy::FilmHub),
            ("Film Lists", Strategy::FilmLists),
            ("Box Office Records", Strategy::BoxOffice),
            ("Academy Awards", Strategy::AcademyAwards),
            ("Cannes Film Festival", Strategy::FilmFestival),
            ("Random Wiki Page", Strategy::GenericWikipedia),
        ];
        for (name, expected) in cases {
            let strategy = Strategy::for_target(&target(name, json!({}))).unwrap();
            assert_eq!(strategy, expected, "for target {name}");
        }
    }

    #[test]
    fn test_adult_strategy_requires_age_restriction_rule() {
        let ok = target("Something Weird Video", json!({"age_restriction": "18+"}));
        assert_eq!(
            Strategy::for_target(&ok).unwrap(),
            Strategy::AdultCatalog(AdultSite::SomethingWeird)
        );

        let missing = target("Something Weird Video", json!({}));
        assert!(Strategy::for_target(&missing).is_err());

        // any target can opt in through its rules
        let opted_in = target("Obscure Shop", json!({"age_restriction": "18+"}));
        assert_eq!(
            Strategy::for_target(&opted_in).unwrap(),
            Strategy::AdultCatalog(AdultSite::Generic)
        );
    }
}
