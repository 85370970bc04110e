//! wt-resolver library interface
//!
//! Resolves references to external datasets held in the DataONE federation
//! into package trees ([`PackageNode`]) or flat summary records
//! ([`DataMapRecord`]).

pub mod config;
pub mod error;
pub mod identifier;
pub mod rdf;
pub mod services;
pub mod types;
pub mod validators;
pub mod workflow;

pub use crate::config::ResolverConfig;
pub use crate::error::{ResolveError, ResolveResult};
pub use crate::identifier::IdentifierNormalizer;
pub use crate::types::{DataMapRecord, FileEntry, PackageNode, Pid, Repository};
pub use crate::workflow::{BatchReport, BatchResolver, LookupFailure, PackageTreeBuilder};

use crate::services::{GraphSource, IndexQuery, ResolveGraphClient, SolrIndexClient};
use std::sync::Arc;

/// Tree builder and batch resolver wired to the live services
///
/// One HTTP client is shared by the index, graph and HTTP lookup clients.
pub struct Resolver {
    pub tree: PackageTreeBuilder,
    pub batch: BatchResolver,
}

impl Resolver {
    pub fn from_config(config: &ResolverConfig) -> ResolveResult<Self> {
        let http_client = config.http_client()?;
        let index: Arc<dyn IndexQuery> = Arc::new(SolrIndexClient::new(config, http_client.clone()));
        let graph: Arc<dyn GraphSource> = Arc::new(ResolveGraphClient::new(config, http_client.clone()));

        Ok(Self {
            tree: PackageTreeBuilder::new(config, Arc::clone(&index), graph)?,
            batch: BatchResolver::from_config(config, index, http_client)?,
        })
    }
}
