//! HTTP page fetching
//!
//! Returns raw HTML text; parsing happens at the call site so documents
//! never live across await points. A base URL override exists for tests.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::FetchError;

pub struct PageFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl PageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolve relative URLs against `base_url` instead of rejecting them
    pub fn with_base_url(config: &ScraperConfig, base_url: &str) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(config)?;
        fetcher.base_url = Some(
            Url::parse(base_url).map_err(|_| FetchError::InvalidUrl(base_url.to_string()))?,
        );
        Ok(fetcher)
    }

    /// Turn a possibly relative URL into the absolute URL to fetch
    pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        match &self.base_url {
            Some(base) => base
                .join(url)
                .map_err(|_| FetchError::InvalidUrl(url.to_string())),
            None => {
                let parsed =
                    Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(FetchError::InvalidUrl(url.to_string()));
                }
                Ok(parsed)
            }
        }
    }

    /// Fetch a page and return its body text
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resolved = self.resolve(url)?;
        debug!(url = %resolved, "fetching page");

        let response = self.client.get(resolved).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(FetchError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_absolute_without_base() {
        let fetcher = PageFetcher::new(&ScraperConfig::default()).unwrap();
        assert!(fetcher.resolve("https://example.org/wiki/Film").is_ok());
        assert!(matches!(
            fetcher.resolve("/wiki/Film"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.resolve("ftp://example.org/file"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_resolve_joins_against_base() {
        let fetcher =
            PageFetcher::with_base_url(&ScraperConfig::default(), "https://example.org").unwrap();
        let url = fetcher.resolve("/wiki/Film").unwrap();
        assert_eq!(url.as_str(), "https://example.org/wiki/Film");
    }
}
