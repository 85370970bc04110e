//! Resource map locator
//!
//! Finds the package (resource map) aggregating a PID. A document may have
//! several historical owners; only the non-obsoleted tip is authoritative,
//! and anything else is refused rather than guessed.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::services::index_client::{identifier_query, non_obsolete_query, IndexQuery, LOCATE_FIELDS};
use crate::types::{IndexDocument, Pid, QueryRequest};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct ResourceMapLocator {
    index: Arc<dyn IndexQuery>,
    rows: u32,
}

impl ResourceMapLocator {
    pub fn new(index: Arc<dyn IndexQuery>, config: &ResolverConfig) -> Self {
        Self {
            index,
            rows: config.query_rows,
        }
    }

    /// Resolve a canonical PID to the PID of its package
    ///
    /// # Errors
    /// - `NotFound` if the PID is not indexed or belongs to no package
    /// - `Ambiguous` if the PID matches several documents, or several
    ///   resource maps survive obsolescence filtering
    pub async fn locate_package(&self, pid: &Pid) -> ResolveResult<Pid> {
        let request = QueryRequest::new(identifier_query(pid), LOCATE_FIELDS).with_rows(self.rows);
        let result = self.index.query(&request).await?;

        let doc = match result.docs.as_slice() {
            [] => {
                return Err(ResolveError::NotFound(format!(
                    "No object was found in the index for {}",
                    pid
                )))
            }
            [doc] => doc,
            docs => {
                return Err(ResolveError::Ambiguous(format!(
                    "{} objects were found in the index for the identifier {}",
                    docs.len(),
                    pid
                )))
            }
        };

        if let IndexDocument::Resource(resource) = doc {
            tracing::debug!(pid = %pid, "Identifier is itself a resource map");
            return Ok(resource.identifier.clone());
        }

        let candidates: Vec<Pid> = doc
            .resource_maps()
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match candidates.as_slice() {
            [] => Err(ResolveError::NotFound(format!(
                "{} is not aggregated by any resource map",
                pid
            ))),
            [only] => Ok(only.clone()),
            _ => {
                let current = self.find_non_obsolete(&candidates).await?;
                match current.as_slice() {
                    [tip] => {
                        tracing::debug!(
                            pid = %pid,
                            candidates = candidates.len(),
                            package = %tip,
                            "Selected non-obsoleted resource map"
                        );
                        Ok(tip.clone())
                    }
                    _ => Err(ResolveError::Ambiguous(format!(
                        "{} is aggregated by {} resource maps, {} of them current",
                        pid,
                        candidates.len(),
                        current.len()
                    ))),
                }
            }
        }
    }

    /// Candidates not obsoleted by any other object
    async fn find_non_obsolete(&self, candidates: &[Pid]) -> ResolveResult<Vec<Pid>> {
        let request = QueryRequest::new(non_obsolete_query(candidates), &["identifier", "formatType"])
            .with_rows(self.rows);
        let result = self.index.query(&request).await?;

        Ok(result.docs.iter().map(|doc| doc.identifier().clone()).collect())
    }
}
