//! TOML configuration parsing and validation.
//!
//! Only `[db]` is required; every other section falls back to defaults
//! suitable for polling Letterboxd.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Where reviews come from and how to reach it.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Origin tag written into every stored row.
    #[serde(default = "default_source_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Listing page variants, tried in order under `/film/<subject>/`.
    #[serde(default = "default_listing_paths")]
    pub listing_paths: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: default_source_name(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            listing_paths: default_listing_paths(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_source_name() -> String {
    "letterboxd".to_string()
}
fn default_base_url() -> String {
    "https://letterboxd.com".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (review-harvester)".to_string()
}
fn default_listing_paths() -> Vec<String> {
    vec!["reviews/popular/".to_string(), "reviews/".to_string()]
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            interval_secs: default_interval_secs(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

fn default_subjects() -> Vec<String> {
    [
        "hot-fuzz",
        "birdman-or-the-unexpected-virtue-of-ignorance",
        "nightcrawler",
        "the-batman",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_interval_secs() -> u64 {
    30
}
fn default_fetch_limit() -> usize {
    5
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            default_language: default_language(),
        }
    }
}

fn default_min_text_chars() -> usize {
    20
}
fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Defaults everywhere, database under `./data`.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/reviews.sqlite"),
            },
            source: SourceConfig::default(),
            scheduler: SchedulerConfig::default(),
            extract: ExtractConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.source.name.trim().is_empty() {
        anyhow::bail!("source.name must not be empty");
    }
    if !(config.source.base_url.starts_with("http://")
        || config.source.base_url.starts_with("https://"))
    {
        anyhow::bail!(
            "source.base_url must start with http:// or https:// (got '{}')",
            config.source.base_url
        );
    }
    if config.source.listing_paths.is_empty() {
        anyhow::bail!("source.listing_paths must contain at least one path");
    }
    if config.source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    if config.scheduler.subjects.is_empty() {
        anyhow::bail!("scheduler.subjects must contain at least one subject");
    }
    if let Some(bad) = config
        .scheduler
        .subjects
        .iter()
        .find(|s| s.is_empty() || s.contains('/'))
    {
        anyhow::bail!("invalid subject slug: '{}'", bad);
    }
    if config.scheduler.interval_secs == 0 {
        anyhow::bail!("scheduler.interval_secs must be > 0");
    }
    if config.scheduler.fetch_limit == 0 {
        anyhow::bail!("scheduler.fetch_limit must be > 0");
    }

    if config.extract.default_language.trim().is_empty() {
        anyhow::bail!("extract.default_language must not be empty");
    }

    Ok(())
}
