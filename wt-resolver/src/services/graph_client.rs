//! Resource map graph client
//!
//! Fetches `{graph_base}/resolve/{pid}` as RDF/XML and extracts the two
//! relations the resolver cares about: `ore:aggregates` (package membership)
//! and `cito:isDocumentedBy` (naming metadata candidates). Related nodes are
//! mapped to PIDs through their `dcterms:identifier` literals.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::identifier::unescape_pid;
use crate::rdf::{Graph, Term, CITO_IS_DOCUMENTED_BY, DCTERMS_IDENTIFIER, ORE_AGGREGATES};
use crate::types::{Aggregation, Pid};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Semantic graph seam
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Fetch a package's resource map and extract membership and documenting sets
    ///
    /// # Errors
    /// `UpstreamUnavailable` on fetch or parse failure
    async fn fetch_aggregation(&self, package: &Pid) -> ResolveResult<Aggregation>;
}

/// HTTP client for `{graph_base}/resolve/{pid}`
#[derive(Clone)]
pub struct ResolveGraphClient {
    http_client: reqwest::Client,
    config: ResolverConfig,
}

impl ResolveGraphClient {
    pub fn new(config: &ResolverConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl GraphSource for ResolveGraphClient {
    async fn fetch_aggregation(&self, package: &Pid) -> ResolveResult<Aggregation> {
        let url = self.config.resolve_url(package);

        tracing::debug!(package = %package, url = %url, "Fetching resource map");

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/rdf+xml")
            .send()
            .await
            .map_err(|e| ResolveError::UpstreamUnavailable(format!("Graph request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamUnavailable(format!(
                "Graph fetch for {} returned HTTP {}",
                package,
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::UpstreamUnavailable(format!("Graph body read failed: {}", e)))?;

        let graph = Graph::parse(&body, &url).map_err(|e| {
            ResolveError::UpstreamUnavailable(format!("Resource map {} not parseable: {}", package, e))
        })?;

        let aggregation = extract_aggregation(&graph);

        tracing::debug!(
            package = %package,
            triples = graph.triple_count(),
            members = aggregation.membership.len(),
            documenting = aggregation.documenting.len(),
            "Resource map parsed"
        );

        Ok(aggregation)
    }
}

/// Pull membership and documenting sets out of a parsed resource map
pub fn extract_aggregation(graph: &Graph) -> Aggregation {
    Aggregation {
        membership: identifiers_of(graph, ORE_AGGREGATES),
        documenting: identifiers_of(graph, CITO_IS_DOCUMENTED_BY),
    }
}

fn identifiers_of(graph: &Graph, predicate: &str) -> BTreeSet<Pid> {
    let mut pids = BTreeSet::new();
    for node in graph.objects(predicate) {
        if matches!(node, Term::Literal(_)) {
            continue;
        }
        for id in graph.objects_of(node, DCTERMS_IDENTIFIER) {
            pids.insert(Pid::new(unescape_pid(id.as_str())));
        }
    }
    pids
}
