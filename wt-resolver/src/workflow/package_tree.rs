//! Package tree builder
//!
//! Resolves a reference to its package and materializes the package as a
//! tree: one node per resource map, files keyed by name, sub-packages keyed by
//! their title.
//!
//! # Per-node algorithm
//! 1. Fetch every index document whose `resourceMap` is this package
//! 2. Fetch the resource map graph and verify it against those documents
//! 3. Pick the documenting metadata (the one carrying `documents`); the
//!    graph must name exactly that document as its `isDocumentedBy` target
//! 4. List data documents and any other metadata as files
//! 5. Recurse into every resource document, depth first
//!
//! Names are unique within a node: a file or sub-package whose name is
//! already taken is keyed `name (identifier)` instead.
//!
//! Any failure anywhere in the tree fails the whole call. No partial tree is
//! ever returned.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::identifier::{unescape_pid, IdentifierNormalizer};
use crate::services::index_client::{resource_map_query, IndexQuery, PACKAGE_FIELDS};
use crate::services::{GraphSource, ResourceMapLocator};
use crate::types::{
    Aggregation, DataDocument, FileEntry, IndexDocument, MetadataDocument, PackageNode, Pid, QueryRequest,
};
use crate::validators;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builds [`PackageNode`] trees from the index and resource map graph
pub struct PackageTreeBuilder {
    normalizer: IdentifierNormalizer,
    locator: ResourceMapLocator,
    index: Arc<dyn IndexQuery>,
    graph: Arc<dyn GraphSource>,
    config: ResolverConfig,
}

impl PackageTreeBuilder {
    /// # Errors
    /// `Config` if the configured identifier patterns do not compile
    pub fn new(
        config: &ResolverConfig,
        index: Arc<dyn IndexQuery>,
        graph: Arc<dyn GraphSource>,
    ) -> ResolveResult<Self> {
        Ok(Self {
            normalizer: IdentifierNormalizer::new(config)?,
            locator: ResourceMapLocator::new(Arc::clone(&index), config),
            index,
            graph,
            config: config.clone(),
        })
    }

    /// Resolve a reference and build the tree of its package
    pub async fn build_tree(&self, reference: &str) -> ResolveResult<PackageNode> {
        self.build_tree_cancellable(reference, &CancellationToken::new()).await
    }

    /// [`build_tree`](Self::build_tree) that aborts with `Cancelled` once
    /// `cancel` fires
    ///
    /// In-flight requests are dropped at cancellation; no further requests
    /// are issued.
    pub async fn build_tree_cancellable(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ResolveResult<PackageNode> {
        let pid = self.normalizer.normalize(reference);
        info!(reference = %reference, pid = %pid, "Building package tree");

        let package = guarded(cancel, self.locator.locate_package(&pid)).await?;
        let tree = self.build_node(package, 1, cancel).await?;

        info!(
            package = %tree.identifier,
            name = %tree.name,
            files = tree.file_count(),
            total_size = tree.total_size(),
            depth = tree.depth(),
            "Package tree built"
        );

        Ok(tree)
    }

    /// Build the tree rooted at an already-located package PID
    pub async fn build_package(&self, package: &Pid) -> ResolveResult<PackageNode> {
        self.build_node(package.clone(), 1, &CancellationToken::new()).await
    }

    fn build_node<'a>(
        &'a self,
        package: Pid,
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, ResolveResult<PackageNode>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            if depth > self.config.max_depth {
                return Err(ResolveError::DepthExceeded {
                    package,
                    limit: self.config.max_depth,
                });
            }

            let request = QueryRequest::new(resource_map_query(&package), PACKAGE_FIELDS)
                .with_rows(self.config.query_rows);
            let docs = guarded(cancel, self.index.query(&request)).await?.docs;
            let aggregation = guarded(cancel, self.graph.fetch_aggregation(&package)).await?;

            validators::verify(&package, &aggregation.membership, &docs)?;

            let mut metadata: Vec<&MetadataDocument> = Vec::new();
            let mut data: Vec<&DataDocument> = Vec::new();
            let mut resources: Vec<Pid> = Vec::new();
            for doc in &docs {
                match doc {
                    IndexDocument::Metadata(m) => metadata.push(m),
                    IndexDocument::Data(d) => data.push(d),
                    IndexDocument::Resource(r) => resources.push(r.identifier.clone()),
                }
            }

            let primary = documenting_metadata(&package, &metadata, &aggregation)?;
            let file_list = self.file_list(&package, primary, &metadata, &data)?;

            let name = primary
                .title
                .clone()
                .unwrap_or_else(|| primary.identifier.to_string());

            debug!(
                package = %package,
                depth,
                files = file_list.len(),
                children = resources.len(),
                "Package node listed"
            );

            let mut children: BTreeMap<String, PackageNode> = BTreeMap::new();
            for child_pid in resources {
                let child = self.build_node(child_pid, depth + 1, cancel).await?;
                let key = unique_key(&package, &children, &child.name, &child.identifier)?;
                children.insert(key, child);
            }

            Ok(PackageNode {
                name,
                identifier: package,
                file_list,
                children,
            })
        })
    }

    /// Data documents plus every metadata document except the primary
    fn file_list(
        &self,
        package: &Pid,
        primary: &MetadataDocument,
        metadata: &[&MetadataDocument],
        data: &[&DataDocument],
    ) -> ResolveResult<BTreeMap<String, FileEntry>> {
        let entries = data
            .iter()
            .map(|d| (&d.identifier, d.file_name.as_ref(), d.size, d.format_id.as_ref()))
            .chain(
                metadata
                    .iter()
                    .filter(|m| m.identifier != primary.identifier)
                    .map(|m| (&m.identifier, m.file_name.as_ref(), m.size, m.format_id.as_ref())),
            );

        let mut file_list: BTreeMap<String, FileEntry> = BTreeMap::new();
        for (identifier, file_name, size, format_id) in entries {
            let name = file_name
                .cloned()
                .unwrap_or_else(|| identifier.to_string());
            let key = unique_key(package, &file_list, &name, identifier)?;

            file_list.insert(
                key,
                FileEntry {
                    size: size.unwrap_or(0),
                    identifier: identifier.clone(),
                    url: self.config.resolve_url(identifier),
                    mime_type: format_id.cloned(),
                },
            );
        }
        Ok(file_list)
    }
}

/// `name`, or `name (identifier)` when `name` is already taken in `entries`
///
/// # Errors
/// `Ambiguous` if the qualified key is taken too
fn unique_key<V>(
    package: &Pid,
    entries: &BTreeMap<String, V>,
    name: &str,
    identifier: &Pid,
) -> ResolveResult<String> {
    if !entries.contains_key(name) {
        return Ok(name.to_string());
    }

    let qualified = format!("{} ({})", name, identifier);
    if entries.contains_key(&qualified) {
        return Err(ResolveError::Ambiguous(format!(
            "Package {} lists {} more than once",
            package, qualified
        )));
    }

    warn!(package = %package, name = %name, key = %qualified, "Duplicate name, keyed by identifier");
    Ok(qualified)
}

/// The single metadata document naming this package
///
/// # Errors
/// - `Ambiguous` unless exactly one index metadata document carries
///   `documents`, or unless the graph names exactly one documenting object
/// - `Inconsistent` if the graph names a different object than the index
fn documenting_metadata<'a>(
    package: &Pid,
    metadata: &[&'a MetadataDocument],
    aggregation: &Aggregation,
) -> ResolveResult<&'a MetadataDocument> {
    let candidates: Vec<&'a MetadataDocument> = metadata
        .iter()
        .copied()
        .filter(|m| m.documents.is_some())
        .collect();

    let primary = match candidates.as_slice() {
        [one] => *one,
        other => {
            return Err(ResolveError::Ambiguous(format!(
                "Package {} has {} documenting metadata documents in the index",
                package,
                other.len()
            )))
        }
    };

    let documenting: Vec<&Pid> = aggregation.documenting.iter().collect();
    match documenting.as_slice() {
        [one] => {
            let primary_id = unescape_pid(primary.identifier.as_str());
            if one.as_str() == primary_id {
                Ok(primary)
            } else {
                Err(ResolveError::Inconsistent {
                    package: package.clone(),
                    missing_from_index: vec![one.to_string()],
                    missing_from_graph: vec![primary_id],
                })
            }
        }
        other => Err(ResolveError::Ambiguous(format!(
            "Resource map {} names {} documenting objects",
            package,
            other.len()
        ))),
    }
}

/// Race `fut` against cancellation
async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> ResolveResult<T>
where
    F: Future<Output = ResolveResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ResolveError::Cancelled),
        result = fut => result,
    }
}
