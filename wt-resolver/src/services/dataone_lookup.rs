//! DataONE lookup strategy
//!
//! Summarizes the package a reference belongs to as a single
//! [`DataMapRecord`], without walking sub-packages.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::identifier::IdentifierNormalizer;
use crate::services::index_client::{resource_map_query, IndexQuery, PACKAGE_FIELDS};
use crate::services::{LookupStrategy, ResourceMapLocator};
use crate::types::{DataMapRecord, IndexDocument, MetadataDocument, QueryRequest, Repository};
use async_trait::async_trait;
use std::sync::Arc;

const NO_TITLE: &str = "no title";

pub struct DataOneLookup {
    normalizer: IdentifierNormalizer,
    locator: ResourceMapLocator,
    index: Arc<dyn IndexQuery>,
    rows: u32,
}

impl DataOneLookup {
    pub fn new(config: &ResolverConfig, index: Arc<dyn IndexQuery>) -> ResolveResult<Self> {
        Ok(Self {
            normalizer: IdentifierNormalizer::new(config)?,
            locator: ResourceMapLocator::new(Arc::clone(&index), config),
            index,
            rows: config.query_rows,
        })
    }
}

#[async_trait]
impl LookupStrategy for DataOneLookup {
    fn name(&self) -> &'static str {
        "DataONE"
    }

    async fn lookup(&self, reference: &str) -> ResolveResult<Option<DataMapRecord>> {
        let pid = self.normalizer.normalize(reference);
        let package = self.locator.locate_package(&pid).await?;

        let request = QueryRequest::new(resource_map_query(&package), PACKAGE_FIELDS).with_rows(self.rows);
        let result = self.index.query(&request).await?;

        let metadata: Vec<&MetadataDocument> = result
            .docs
            .iter()
            .filter_map(|doc| match doc {
                IndexDocument::Metadata(m) => Some(m),
                _ => None,
            })
            .collect();

        let primary = metadata
            .iter()
            .find(|m| m.documents.is_some())
            .or_else(|| metadata.first())
            .ok_or_else(|| ResolveError::NotFound(format!("Package {} has no metadata", package)))?;

        let identifier = primary.identifier.as_str();
        let doi = identifier.rsplit("doi:").next().unwrap_or(identifier);

        tracing::debug!(reference = %reference, package = %package, "DataONE lookup succeeded");

        Ok(Some(DataMapRecord {
            data_id: package.into_string(),
            doi: doi.to_string(),
            name: primary.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
            repository: Repository::DataOne,
            size: primary.size.map(|s| s as i64).unwrap_or(-1),
        }))
    }
}
