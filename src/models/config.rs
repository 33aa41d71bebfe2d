//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sticker keywords to look for (case-insensitive substrings)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Inventory API and request pacing settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Worker pool sizes
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Seen-item ledger settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Messaging endpoint settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scraper;
        if s.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("scraper.user_agents is empty"));
        }
        if s.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if s.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        if !delay_bounds_ok(s.min_delay_secs, s.max_delay_secs) {
            return Err(AppError::validation(
                "scraper delay bounds must satisfy 0 <= min_delay_secs <= max_delay_secs",
            ));
        }
        if s.min_price > s.max_price {
            return Err(AppError::validation(
                "scraper.min_price must not exceed scraper.max_price",
            ));
        }
        if s.initial_page_limit == 0 || s.page_limit == 0 || s.group_page_limit == 0 {
            return Err(AppError::validation("page limits must be > 0"));
        }
        if self.workers.group == 0 || self.workers.item == 0 || self.workers.notify == 0 {
            return Err(AppError::validation("worker pool sizes must be > 0"));
        }
        if self.ledger.retention_days == 0 {
            return Err(AppError::validation("ledger.retention_days must be > 0"));
        }
        let n = &self.notifier;
        if !delay_bounds_ok(n.min_delay_secs, n.max_delay_secs) {
            return Err(AppError::validation(
                "notifier delay bounds must satisfy 0 <= min_delay_secs <= max_delay_secs",
            ));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::validation("No keywords defined"));
        }
        Ok(())
    }

    /// Append keywords, skipping blanks and ones already present.
    pub fn extend_keywords<I>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = String>,
    {
        for keyword in keywords {
            let keyword = keyword.trim();
            if !keyword.is_empty() && !self.keywords.iter().any(|k| k == keyword) {
                self.keywords.push(keyword.to_string());
            }
        }
    }
}

/// Finite, non-negative and ordered.
fn delay_bounds_ok(min: f64, max: f64) -> bool {
    min.is_finite() && max.is_finite() && min >= 0.0 && min <= max
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            scraper: ScraperConfig::default(),
            workers: WorkerConfig::default(),
            ledger: LedgerConfig::default(),
            notifier: NotifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Inventory API and request pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the inventory API
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    #[serde(default = "defaults::game_id")]
    pub game_id: u32,

    #[serde(default = "defaults::min_price")]
    pub min_price: f64,

    #[serde(default = "defaults::max_price")]
    pub max_price: f64,

    /// Lower bound of the random pre-request delay
    #[serde(default = "defaults::min_delay")]
    pub min_delay_secs: f64,

    /// Upper bound of the random pre-request delay
    #[serde(default = "defaults::max_delay")]
    pub max_delay_secs: f64,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum in-flight requests across all stages
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Page size of the first discovery page
    #[serde(default = "defaults::initial_page_limit")]
    pub initial_page_limit: u32,

    /// Page size of every later discovery page
    #[serde(default = "defaults::page_limit")]
    pub page_limit: u32,

    /// Page size when fetching all items of one group
    #[serde(default = "defaults::group_page_limit")]
    pub group_page_limit: u32,

    /// User-Agent pool; one is picked per request
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Extra headers sent with every request
    #[serde(default = "defaults::headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            game_id: defaults::game_id(),
            min_price: defaults::min_price(),
            max_price: defaults::max_price(),
            min_delay_secs: defaults::min_delay(),
            max_delay_secs: defaults::max_delay(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            initial_page_limit: defaults::initial_page_limit(),
            page_limit: defaults::page_limit(),
            group_page_limit: defaults::group_page_limit(),
            user_agents: defaults::user_agents(),
            headers: defaults::headers(),
        }
    }
}

/// Worker pool sizes per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "defaults::group_workers")]
    pub group: usize,

    #[serde(default = "defaults::item_workers")]
    pub item: usize,

    #[serde(default = "defaults::notify_workers")]
    pub notify: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            group: defaults::group_workers(),
            item: defaults::item_workers(),
            notify: defaults::notify_workers(),
        }
    }
}

/// Seen-item ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    #[serde(default = "defaults::ledger_path")]
    pub path: String,

    /// Entries older than this are purged when the ledger opens
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,
}

impl LedgerConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: defaults::ledger_path(),
            retention_days: defaults::retention_days(),
        }
    }
}

/// Messaging endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "defaults::notifier_api_base")]
    pub api_base: String,

    #[serde(default = "defaults::notify_min_delay")]
    pub min_delay_secs: f64,

    #[serde(default = "defaults::notify_max_delay")]
    pub max_delay_secs: f64,

    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::notifier_api_base(),
            min_delay_secs: defaults::notify_min_delay(),
            max_delay_secs: defaults::notify_max_delay(),
            parse_mode: defaults::parse_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    // Scraper defaults
    pub fn api_base() -> String {
        "https://tradeit.gg/api/v2".into()
    }
    pub fn game_id() -> u32 {
        730
    }
    pub fn min_price() -> f64 {
        10.0
    }
    pub fn max_price() -> f64 {
        20.0
    }
    pub fn min_delay() -> f64 {
        1.0
    }
    pub fn max_delay() -> f64 {
        3.0
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        3
    }
    pub fn initial_page_limit() -> u32 {
        120
    }
    pub fn page_limit() -> u32 {
        160
    }
    pub fn group_page_limit() -> u32 {
        500
    }
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into(),
            "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".into(),
        ]
    }
    pub fn headers() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Accept".into(), "application/json, text/plain, */*".into()),
            ("Accept-Language".into(), "en-US,en;q=0.9".into()),
        ])
    }

    // Worker defaults
    pub fn group_workers() -> usize {
        1
    }
    pub fn item_workers() -> usize {
        4
    }
    pub fn notify_workers() -> usize {
        1
    }

    // Ledger defaults
    pub fn ledger_path() -> String {
        "SeenItems.db".into()
    }
    pub fn retention_days() -> u32 {
        3
    }

    // Notifier defaults
    pub fn notifier_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn notify_min_delay() -> f64 {
        0.3
    }
    pub fn notify_max_delay() -> f64 {
        0.5
    }
    pub fn parse_mode() -> String {
        "HTML".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            keywords: vec!["Katowice 2014".into()],
            ..Config::default()
        }
    }

    #[test]
    fn validate_config_with_keywords_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_keywords() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_user_agents() {
        let mut config = valid_config();
        config.scraper.user_agents = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.scraper.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = valid_config();
        config.scraper.min_delay_secs = 5.0;
        config.scraper.max_delay_secs = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_infinite_delays() {
        let mut config: Config = toml::from_str(
            r#"
            keywords = ["Katowice 2014"]
            [scraper]
            max_delay_secs = inf
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        config.scraper.max_delay_secs = 3.0;
        config.notifier.max_delay_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        config.notifier.max_delay_secs = 0.5;
        config.notifier.min_delay_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_pool() {
        let mut config = valid_config();
        config.workers.item = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            keywords = ["Holo"]

            [scraper]
            min_price = 5
            max_price = 50

            [workers]
            item = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.keywords, vec!["Holo"]);
        assert_eq!(config.scraper.min_price, 5.0);
        assert_eq!(config.scraper.page_limit, 160);
        assert_eq!(config.workers.item, 8);
        assert_eq!(config.workers.group, 1);
        assert_eq!(config.ledger.retention_days, 3);
    }

    #[test]
    fn extend_keywords_skips_blanks_and_duplicates() {
        let mut config = valid_config();
        config.extend_keywords(vec![
            " Holo ".to_string(),
            "".to_string(),
            "Katowice 2014".to_string(),
        ]);
        assert_eq!(config.keywords, vec!["Katowice 2014", "Holo"]);
    }
}
