//! Top-level configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; a handful of secrets and
//! deployment knobs come from the environment (loaded via `dotenvy` in
//! `main`, then read here with `std::env::var`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::breaker::BreakerConfig;
use crate::engine::EngineConfig;
use crate::error::{ConfigError, Result};
use crate::matcher::MatcherConfig;
use crate::risk::RiskConfig;
use crate::scorer::ScorerConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), format: "pretty".into() }
    }
}

/// Which `Store` backend to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Path or connection string, used when `backend = "sqlite"`.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::default(), database_url: "arbitrex.sqlite".into() }
    }
}

/// Which `MarketFeed` adapter to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedBackend {
    /// Polls each venue's HTTP endpoint, per `venue_urls`.
    #[default]
    Http,
    /// In-memory feed with no markets, for `arbitrex scan --mock` demos.
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub backend: FeedBackend,
    /// Venue name -> base URL, consumed by `HttpMarketFeed`.
    pub venue_urls: HashMap<String, String>,
    pub poll_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { backend: FeedBackend::default(), venue_urls: HashMap::new(), poll_interval_ms: 10_000 }
    }
}

/// Root configuration: one table per collaborator, loaded from a single
/// TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub matcher: MatcherConfig,
    pub scorer: ScorerConfig,
    pub risk: RiskConfig,
    pub breaker: BreakerConfig,
    pub engine: EngineConfig,
    /// Detect opportunities but never call `mark_taken`/`record_outcome`
    /// from the CLI `run` loop.
    pub dry_run: bool,
    /// Path to the status file for external monitoring. Set to enable
    /// status file writing (e.g. "/var/run/arbitrex/status.json").
    pub status_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            matcher: MatcherConfig::default(),
            scorer: ScorerConfig::default(),
            risk: RiskConfig::default(),
            breaker: BreakerConfig::default(),
            engine: EngineConfig::default(),
            dry_run: false,
            status_file: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Fatal startup validation (spec §7's *Fatal* class): a config that
    /// would leave the engine permanently unable to discover anything.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.engine.venues.is_empty() {
            return Err(ConfigError::NoVenuesEnabled.into());
        }
        if self.engine.include_cross_platform
            && !self.matcher.semantic_matching
            && !self.matcher.text_matching
        {
            return Err(ConfigError::NoMatchingMethodEnabled.into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.logging.level));
        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
