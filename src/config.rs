//! Configuration file support for dep-health.
//!
//! Provides YAML-based configuration through `dep-health.config.yml` files,
//! including data structures, file loading, validation, and resolution of
//! file values and command-line overrides into [`Settings`].

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::outbound::network::{DEFAULT_NOT_FOUND_TTL, DEFAULT_TIMEOUT};
use crate::application::use_cases::DEFAULT_MAX_CONCURRENCY;
use crate::health_scoring::policies::{PartialWeights, ScoringWeights};
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "dep-health.config.yml";

/// Environment variable holding a GitHub token; wins over the config file.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub cache_path: Option<String>,
    pub use_cache: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub github_token: Option<String>,
    pub weights: Option<PartialWeights>,
    pub cache_ttl_secs: Option<TtlOverrides>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Per-source cache lifetimes in seconds.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TtlOverrides {
    pub registry: Option<u64>,
    pub downloads: Option<u64>,
    pub repository: Option<u64>,
    pub vulnerabilities: Option<u64>,
    pub not_found: Option<u64>,
}

/// Values given on the command line; they take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub cache_path: Option<PathBuf>,
    pub no_cache: bool,
    pub max_concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved cache lifetimes. `None` keeps the collector's own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub registry: Option<Duration>,
    pub downloads: Option<Duration>,
    pub repository: Option<Duration>,
    pub vulnerabilities: Option<Duration>,
    pub not_found: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            registry: None,
            downloads: None,
            repository: None,
            vulnerabilities: None,
            not_found: DEFAULT_NOT_FOUND_TTL,
        }
    }
}

/// Effective runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_path: PathBuf,
    pub use_cache: bool,
    pub request_timeout: Duration,
    pub max_concurrency: usize,
    pub github_token: Option<String>,
    pub weights: ScoringWeights,
    pub ttls: CacheTtls,
}

impl Settings {
    /// Merges defaults, the config file, CLI overrides and the token from
    /// the environment, then validates the result.
    pub fn resolve(
        file: ConfigFile,
        overrides: &CliOverrides,
        env_token: Option<String>,
    ) -> Result<Self> {
        let request_timeout_secs = overrides
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&request_timeout_secs) {
            bail!(
                "Invalid config: request_timeout_secs must be between 1 and {}, got {}.\n\n\
                 💡 Hint: The default is {} seconds.",
                MAX_REQUEST_TIMEOUT_SECS,
                request_timeout_secs,
                DEFAULT_TIMEOUT.as_secs()
            );
        }

        let max_concurrency = overrides
            .max_concurrency
            .or(file.max_concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            bail!(
                "Invalid config: max_concurrency must be at least 1.\n\n\
                 💡 Hint: The default is {}.",
                DEFAULT_MAX_CONCURRENCY
            );
        }

        let weights = match &file.weights {
            Some(partial) => ScoringWeights::from_partial(partial)?,
            None => ScoringWeights::default(),
        };

        let cache_path = match (&overrides.cache_path, &file.cache_path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => expand_home(path),
            (None, None) => default_cache_path(),
        };

        let github_token = non_blank(env_token).or_else(|| non_blank(file.github_token));

        Ok(Self {
            cache_path,
            use_cache: !overrides.no_cache && file.use_cache.unwrap_or(true),
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_concurrency,
            github_token,
            weights,
            ttls: resolve_ttls(file.cache_ttl_secs.unwrap_or_default())?,
        })
    }
}

fn resolve_ttls(raw: TtlOverrides) -> Result<CacheTtls> {
    let entries = [
        ("registry", raw.registry),
        ("downloads", raw.downloads),
        ("repository", raw.repository),
        ("vulnerabilities", raw.vulnerabilities),
        ("not_found", raw.not_found),
    ];
    for (name, value) in entries {
        if value == Some(0) {
            bail!(
                "Invalid config: cache_ttl_secs.{} must be greater than zero.\n\n\
                 💡 Hint: Use --no-cache to disable caching instead.",
                name
            );
        }
    }

    let secs = |value: Option<u64>| value.map(Duration::from_secs);
    Ok(CacheTtls {
        registry: secs(raw.registry),
        downloads: secs(raw.downloads),
        repository: secs(raw.repository),
        vulnerabilities: secs(raw.vulnerabilities),
        not_found: secs(raw.not_found).unwrap_or(DEFAULT_NOT_FOUND_TTL),
    })
}

fn non_blank(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}

/// `~/.dep-health/cache.db`, or a relative path when there is no home directory.
pub fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".dep-health")
        .join("cache.db")
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().unwrap_or_default().join(rest),
        None => PathBuf::from(path),
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(ref path) = config.cache_path {
        if path.trim().is_empty() {
            bail!(
                "Invalid config: cache_path must not be empty.\n\n\
                 💡 Hint: Remove the field to use ~/.dep-health/cache.db."
            );
        }
    }
    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}
