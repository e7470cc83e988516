//! Configuration for crosstune.
//!
//! Layers, lowest priority first:
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed `CROSSTUNE_`, with `__` separating
//!    nested keys (`CROSSTUNE_BATCH__CONCURRENCY=4`).
//!
//! Without an explicit path, `<config dir>/crosstune/config.toml` is used if
//! it exists.

pub mod error;

use crate::error::{ErrorKind, Result};
use crosstune_music::{Market, Provider};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

const ENV_PREFIX: &str = "CROSSTUNE_";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub providers: ProvidersConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite index database.
    pub database: PathBuf,
    /// Freshness window, in seconds.
    pub freshness: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { database: data_dir().join("index.sqlite"), freshness: 7 * 24 * 60 * 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding durable records.
    pub root: PathBuf,
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self { root: data_dir().join("records") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider tags, e.g. `spotify`, `apple-music`.
    pub enabled: Vec<String>,
    /// Per-call timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Storefront used when an input doesn't imply one.
    pub market: String,
}
impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: Provider::ALL.iter().map(|p| p.as_tag().to_string()).collect(),
            timeout_ms: 5000,
            market: Market::default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum simultaneous resolutions per batch.
    pub concurrency: usize,
}
impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 16 }
    }
}

impl Config {
    /// Load and validate the layered configuration.
    ///
    /// An explicit `path` must exist; the default location is optional.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|p| p.is_file()),
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            debug!(path = %file.display(), "merging configuration file");
            figment = merge_file(figment, &file)?;
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration from an already layered figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.freshness == 0 {
            exn::bail!(ErrorKind::Zero("cache.freshness"));
        }
        if self.providers.timeout_ms == 0 {
            exn::bail!(ErrorKind::Zero("providers.timeout_ms"));
        }
        if self.batch.concurrency == 0 {
            exn::bail!(ErrorKind::Zero("batch.concurrency"));
        }
        self.enabled_providers()?;
        self.market()?;
        Ok(())
    }

    /// Enabled providers, deduplicated, in configuration order.
    pub fn enabled_providers(&self) -> Result<Vec<Provider>> {
        if self.providers.enabled.is_empty() {
            exn::bail!(ErrorKind::NoProviders);
        }
        let mut providers = Vec::with_capacity(self.providers.enabled.len());
        for tag in &self.providers.enabled {
            let provider: Provider = tag.parse::<Provider>().or_raise(|| ErrorKind::UnknownProvider(tag.clone()))?;
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }
        Ok(providers)
    }

    pub fn market(&self) -> Result<Market> {
        self.providers.market.parse::<Market>().or_raise(|| ErrorKind::InvalidMarket(self.providers.market.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.providers.timeout_ms)
    }

    pub fn freshness(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.cache.freshness).unwrap_or(i64::MAX))
    }
}

/// `<config dir>/crosstune/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "crosstune").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn data_dir() -> PathBuf {
    match ProjectDirs::from("", "", "crosstune") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from(".crosstune"),
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
