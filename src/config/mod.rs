//! Configuration management
//!
//! Settings are loaded from a TOML file or from environment variables;
//! env vars win where both are present. Missing API keys are not an
//! error, they just disable the matching client.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
    pub apis: ApiConfig,
    pub logging: LoggingConfig,
}

/// Scraper behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Lower bound of the random inter-request delay, in seconds
    pub min_delay_secs: f64,
    /// Upper bound of the random inter-request delay, in seconds
    pub max_delay_secs: f64,
    /// Per-request timeout for page fetches, in seconds
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// SQLite storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: PathBuf,
}

/// External API credentials
///
/// A client is enabled if and only if its credential is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub omdb_api_key: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_read_access_token: Option<String>,
    pub youtube_api_key: Option<String>,
    /// Per-request timeout for API calls, in seconds
    pub api_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format: "text" or "json"
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            database: DatabaseConfig::default(),
            apis: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 2.0,
            max_delay_secs: 5.0,
            request_timeout_secs: 30,
            user_agent: format!(
                "cinescout/{} (Movie Research Bot)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("cinescout.db"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            omdb_api_key: None,
            tmdb_api_key: None,
            tmdb_read_access_token: None,
            youtube_api_key: None,
            api_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::config(format!("invalid value for {key}: {raw}"))),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse("SCRAPING_DELAY_MIN")? {
            config.scraper.min_delay_secs = v;
        }
        if let Some(v) = env_parse("SCRAPING_DELAY_MAX")? {
            config.scraper.max_delay_secs = v;
        }
        if let Some(v) = env_parse("CINESCOUT_REQUEST_TIMEOUT")? {
            config.scraper.request_timeout_secs = v;
        }
        if let Some(v) = env_string("CINESCOUT_USER_AGENT") {
            config.scraper.user_agent = v;
        }
        if let Some(v) = env_string("CINESCOUT_DB_PATH") {
            config.database.sqlite_path = PathBuf::from(v);
        }
        config.apis.omdb_api_key = env_string("OMDB_API_KEY").or(config.apis.omdb_api_key);
        config.apis.tmdb_api_key = env_string("TMDB_API_KEY").or(config.apis.tmdb_api_key);
        config.apis.tmdb_read_access_token =
            env_string("TMDB_READ_ACCESS_TOKEN").or(config.apis.tmdb_read_access_token);
        config.apis.youtube_api_key =
            env_string("YOUTUBE_API_KEY").or(config.apis.youtube_api_key);
        if let Some(v) = env_parse("CINESCOUT_API_TIMEOUT")? {
            config.apis.api_timeout_secs = v;
        }
        if let Some(v) = env_string("CINESCOUT_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = env_string("CINESCOUT_LOG_FORMAT") {
            config.logging.format = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))?;

        if let Some(v) = env_string("OMDB_API_KEY") {
            config.apis.omdb_api_key = Some(v);
        }
        if let Some(v) = env_string("TMDB_API_KEY") {
            config.apis.tmdb_api_key = Some(v);
        }
        if let Some(v) = env_string("TMDB_READ_ACCESS_TOKEN") {
            config.apis.tmdb_read_access_token = Some(v);
        }
        if let Some(v) = env_string("YOUTUBE_API_KEY") {
            config.apis.youtube_api_key = Some(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scraper.min_delay_secs < 0.0 {
            return Err(Error::config("min_delay_secs must be non-negative"));
        }
        if self.scraper.max_delay_secs < self.scraper.min_delay_secs {
            return Err(Error::config(
                "max_delay_secs must be >= min_delay_secs",
            ));
        }
        if self.scraper.request_timeout_secs == 0 {
            return Err(Error::config("request_timeout_secs must be positive"));
        }
        if self.apis.api_timeout_secs == 0 {
            return Err(Error::config("api_timeout_secs must be positive"));
        }
        if self.scraper.user_agent.trim().is_empty() {
            return Err(Error::config("user_agent must not be empty"));
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(Error::config(format!("unknown log format: {other}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scraper.min_delay_secs, 2.0);
        assert_eq!(config.scraper.max_delay_secs, 5.0);
        assert!(config.apis.omdb_api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_delay_range() {
        let mut config = Config::default();
        config.scraper.min_delay_secs = 6.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_snippet() {
        let toml_str = r#"
            [scraper]
            min_delay_secs = 0.1
            max_delay_secs = 0.2

            [apis]
            omdb_api_key = "abc123"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scraper.min_delay_secs, 0.1);
        assert_eq!(config.apis.omdb_api_key.as_deref(), Some("abc123"));
        // untouched sections keep their defaults
        assert_eq!(config.logging.level, "info");
    }
}
