//! Error types for wt-resolver
//!
//! Every variant is terminal for the resolution it occurs in; nothing is
//! retried locally. Mapping to transport status codes is left to callers,
//! [`ResolveError::code`] gives them a stable key to map from.

use crate::types::Pid;
use thiserror::Error;

/// Resolver error type
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Identifier or package not present in the index
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one candidate where exactly one is required
    #[error("Ambiguous: {0}")]
    Ambiguous(String),

    /// Query result may be incomplete (page limit reached)
    #[error("Query result truncated: {num_found} results for {rows} rows requested ({query})")]
    Truncated {
        query: String,
        rows: u32,
        num_found: u64,
    },

    /// Graph and index disagree on the members of a package
    #[error(
        "Resource map {package} does not match the index \
         (missing from index: {missing_from_index:?}, missing from graph: {missing_from_graph:?})"
    )]
    Inconsistent {
        package: Pid,
        missing_from_index: Vec<String>,
        missing_from_graph: Vec<String>,
    },

    /// Transport, status or decode failure talking to an upstream service
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Resolution aborted through its cancellation token
    #[error("Resolution cancelled")]
    Cancelled,

    /// Package nesting deeper than the configured limit
    #[error("Package {package} exceeds maximum nesting depth {limit}")]
    DepthExceeded { package: Pid, limit: usize },

    /// Invalid resolver configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::NotFound(_) => "NOT_FOUND",
            ResolveError::Ambiguous(_) => "AMBIGUOUS",
            ResolveError::Truncated { .. } => "TRUNCATED",
            ResolveError::Inconsistent { .. } => "INCONSISTENT",
            ResolveError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ResolveError::Cancelled => "CANCELLED",
            ResolveError::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            ResolveError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<wt_common::Error> for ResolveError {
    fn from(err: wt_common::Error) -> Self {
        ResolveError::Config(err.to_string())
    }
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
