//! Consistency Verifier
//!
//! Compares the membership of a package as described by its resource map
//! graph against the documents the search index reports for it. The two
//! sources are independent; any disagreement is a hard error and is never
//! reconciled.

use crate::error::{ResolveError, ResolveResult};
use crate::identifier::unescape_pid;
use crate::types::{IndexDocument, Pid};
use std::collections::BTreeSet;

/// Check graph membership against index documents for one package
///
/// # Errors
/// `Inconsistent` listing the identifiers each side is missing
pub fn verify(package: &Pid, membership: &BTreeSet<Pid>, docs: &[IndexDocument]) -> ResolveResult<()> {
    let graph_ids: BTreeSet<String> = membership.iter().map(|pid| pid.as_str().to_string()).collect();
    let index_ids: BTreeSet<String> = docs
        .iter()
        .map(|doc| unescape_pid(doc.identifier().as_str()))
        .collect();

    if graph_ids == index_ids {
        tracing::debug!(package = %package, members = graph_ids.len(), "Graph and index agree");
        return Ok(());
    }

    let missing_from_index: Vec<String> = graph_ids.difference(&index_ids).cloned().collect();
    let missing_from_graph: Vec<String> = index_ids.difference(&graph_ids).cloned().collect();

    tracing::warn!(
        package = %package,
        missing_from_index = ?missing_from_index,
        missing_from_graph = ?missing_from_graph,
        "Resource map does not match the index"
    );

    Err(ResolveError::Inconsistent {
        package: package.clone(),
        missing_from_index,
        missing_from_graph,
    })
}
