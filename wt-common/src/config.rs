//! Configuration loading
//!
//! Bootstrap configuration is read from a TOML file and then overridden by
//! environment variables. Every field has a built-in default, so a missing
//! file is not an error.
//!
//! # Config file priority
//! 1. Command-line argument (highest priority)
//! 2. `WT_RESOLVER_CONFIG` environment variable
//! 3. `~/.config/wholetale/resolver.toml` (platform config dir)
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// DataONE coordinating node base (serves both the Solr index and `/resolve`)
pub const DEFAULT_D1_BASE: &str = "https://cn.dataone.org/cn/v2";

/// MetacatUI landing page prefix (`#view/` and the newer `/view/` form)
pub const DEFAULT_LANDING_PAGE_PATTERN: &str = r"^https?://search\.dataone\.org/(?:#)?view/";

/// Coordinating node resolve/object URI prefix (`.../v{n}/{verb}/`)
pub const DEFAULT_RESOLVE_URI_PATTERN: &str = r"^https?://cn\.dataone\.org/cn/(?:d1/)?v\d+/\w+/";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "WT_RESOLVER_CONFIG";

const INDEX_BASE_ENV: &str = "WT_INDEX_BASE";
const GRAPH_BASE_ENV: &str = "WT_GRAPH_BASE";
const MAX_WORKERS_ENV: &str = "WT_MAX_WORKERS";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Search index base URL (`{index_base}/query/solr/`)
    pub index_base: String,

    /// Semantic graph base URL (`{graph_base}/resolve/{pid}`)
    pub graph_base: String,

    /// Page size for index queries
    pub query_rows: u32,

    /// Bounded parallelism for batch resolution
    pub max_workers: usize,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Maximum nesting depth of package trees
    pub max_depth: usize,

    /// Regex matching the landing-page prefix to strip
    pub landing_page_pattern: String,

    /// Regex matching the resolve/object URI prefix to strip
    pub resolve_uri_pattern: String,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            index_base: DEFAULT_D1_BASE.to_string(),
            graph_base: DEFAULT_D1_BASE.to_string(),
            query_rows: 1000,
            max_workers: 4,
            request_timeout_secs: 30,
            user_agent: format!("wt-resolver/{}", env!("CARGO_PKG_VERSION")),
            max_depth: 32,
            landing_page_pattern: DEFAULT_LANDING_PAGE_PATTERN.to_string(),
            resolve_uri_pattern: DEFAULT_RESOLVE_URI_PATTERN.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Load configuration following the documented priority order, then
    /// apply environment overrides and validate.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_arg) {
            Some(path) => load_toml_config(&path)?,
            None => {
                debug!("No config file found, using built-in defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WT_INDEX_BASE`, `WT_GRAPH_BASE` and `WT_MAX_WORKERS`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base) = std::env::var(INDEX_BASE_ENV) {
            info!("Index base overridden by {}", INDEX_BASE_ENV);
            self.index_base = base;
        }

        if let Ok(base) = std::env::var(GRAPH_BASE_ENV) {
            info!("Graph base overridden by {}", GRAPH_BASE_ENV);
            self.graph_base = base;
        }

        if let Ok(workers) = std::env::var(MAX_WORKERS_ENV) {
            self.max_workers = workers.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid {} '{}': {}", MAX_WORKERS_ENV, workers, e))
            })?;
        }

        Ok(())
    }

    /// Reject values the resolver cannot work with
    pub fn validate(&self) -> Result<()> {
        for (key, base) in [("index_base", &self.index_base), ("graph_base", &self.graph_base)] {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    key, base
                )));
            }
        }

        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }

        if self.query_rows == 0 {
            return Err(Error::Config("query_rows must be at least 1".to_string()));
        }

        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Find the config file to load, if any
///
/// An explicit path (CLI or environment) is returned even if it does not
/// exist so that loading reports the error; the platform default is only
/// returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wholetale").join("resolver.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}
