//! Resolver configuration
//!
//! Built once from the bootstrap [`TomlConfig`] and handed to every
//! component; there is no module-level state.

use crate::error::{ResolveError, ResolveResult};
use crate::types::Pid;
use std::time::Duration;
use wt_common::config::TomlConfig;

/// Runtime configuration shared by all resolver components
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Search index base URL, without trailing slash
    pub index_base: String,
    /// Semantic graph base URL, without trailing slash
    pub graph_base: String,
    pub query_rows: u32,
    pub max_workers: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_depth: usize,
    pub landing_page_pattern: String,
    pub resolve_uri_pattern: String,
}

impl ResolverConfig {
    /// Point both index and graph at the same base (e.g. a mock server)
    pub fn with_base(base: &str) -> Self {
        let mut config = Self::default();
        config.index_base = trim_base(base);
        config.graph_base = trim_base(base);
        config
    }

    /// `{graph_base}/resolve/{pid}` with the PID escaped as a path segment
    pub fn resolve_url(&self, pid: &Pid) -> String {
        format!("{}/resolve/{}", self.graph_base, urlencoding::encode(pid.as_str()))
    }

    /// `{index_base}/query/solr/`
    pub fn query_url(&self) -> String {
        format!("{}/query/solr/", self.index_base)
    }

    /// Shared HTTP client with the configured timeout and user agent
    pub fn http_client(&self) -> ResolveResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| ResolveError::Config(format!("HTTP client: {}", e)))
    }
}

impl From<&TomlConfig> for ResolverConfig {
    fn from(toml: &TomlConfig) -> Self {
        Self {
            index_base: trim_base(&toml.index_base),
            graph_base: trim_base(&toml.graph_base),
            query_rows: toml.query_rows,
            max_workers: toml.max_workers,
            request_timeout: Duration::from_secs(toml.request_timeout_secs),
            user_agent: toml.user_agent.clone(),
            max_depth: toml.max_depth,
            landing_page_pattern: toml.landing_page_pattern.clone(),
            resolve_uri_pattern: toml.resolve_uri_pattern.clone(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
