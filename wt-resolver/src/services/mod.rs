//! Upstream clients and per-reference lookup strategies
//!
//! # Services
//! 1. **index_client** - Solr query execution with truncation detection
//! 2. **graph_client** - Resource map fetch and RDF relation extraction
//! 3. **resource_map_locator** - PID to owning package
//! 4. **dataone_lookup** - DataONE strategy for batch lookup
//! 5. **http_lookup** - Plain HTTP file strategy for batch lookup

pub mod dataone_lookup;
pub mod graph_client;
pub mod http_lookup;
pub mod index_client;
pub mod resource_map_locator;

pub use dataone_lookup::DataOneLookup;
pub use graph_client::{GraphSource, ResolveGraphClient};
pub use http_lookup::HttpLookup;
pub use index_client::{IndexQuery, SolrIndexClient};
pub use resource_map_locator::ResourceMapLocator;

use crate::error::ResolveResult;
use crate::types::DataMapRecord;
use async_trait::async_trait;

/// One way of turning a free-form reference into a [`DataMapRecord`]
///
/// Strategies are independent: every strategy is tried for every
/// reference and none sees another's outcome.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    /// Strategy name for logs and failure reports
    fn name(&self) -> &'static str;

    /// Attempt a lookup
    ///
    /// `Ok(None)` means the reference is not applicable to this strategy.
    async fn lookup(&self, reference: &str) -> ResolveResult<Option<DataMapRecord>>;
}

// ============================================================================
// Mocks for Testing
// ============================================================================
