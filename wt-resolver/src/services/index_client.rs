//! Search index (Solr) query client
//!
//! Single attempt per call, no retries, no pagination. A page that comes
//! back full is reported as [`ResolveError::Truncated`] rather than handed
//! on as partial data.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::identifier::solr_phrase;
use crate::types::{IndexDocument, Pid, QueryRequest, QueryResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Fields needed to locate a document's package
pub const LOCATE_FIELDS: &[&str] = &["identifier", "formatType", "formatId", "resourceMap"];

/// Fields needed to build a package node
pub const PACKAGE_FIELDS: &[&str] = &[
    "identifier",
    "formatType",
    "title",
    "size",
    "formatId",
    "fileName",
    "documents",
];

/// Search index seam
#[async_trait]
pub trait IndexQuery: Send + Sync {
    /// Execute one page of a query
    ///
    /// # Errors
    /// - `UpstreamUnavailable` on transport, HTTP status, decode or Solr status failure
    /// - `Truncated` when the page is full
    async fn query(&self, request: &QueryRequest) -> ResolveResult<QueryResult>;
}

#[derive(Debug, Deserialize)]
struct SolrEnvelope {
    #[serde(rename = "responseHeader")]
    response_header: SolrHeader,
    response: Option<SolrResponse>,
}

#[derive(Debug, Deserialize)]
struct SolrHeader {
    status: i64,
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<IndexDocument>,
}

/// HTTP client for `{index_base}/query/solr/`
#[derive(Clone)]
pub struct SolrIndexClient {
    http_client: reqwest::Client,
    query_url: String,
}

impl SolrIndexClient {
    pub fn new(config: &ResolverConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            query_url: config.query_url(),
        }
    }
}

#[async_trait]
impl IndexQuery for SolrIndexClient {
    async fn query(&self, request: &QueryRequest) -> ResolveResult<QueryResult> {
        let params = [
            ("q", request.expr.clone()),
            ("fl", request.fields.join(",")),
            ("rows", request.rows.to_string()),
            ("start", request.start.to_string()),
            ("wt", "json".to_string()),
        ];

        tracing::debug!(query = %request.expr, rows = request.rows, "Querying search index");

        let response = self
            .http_client
            .get(&self.query_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ResolveError::UpstreamUnavailable(format!("Index request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResolveError::UpstreamUnavailable(format!(
                "Index returned HTTP {} for '{}': {}",
                status.as_u16(),
                request.expr,
                error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::UpstreamUnavailable(format!("Index body read failed: {}", e)))?;

        let result = decode_envelope(&body, request)?;

        tracing::debug!(
            query = %request.expr,
            num_found = result.num_found,
            "Index query completed"
        );

        Ok(result)
    }
}

/// Decode a Solr JSON envelope and apply the status and truncation checks
pub fn decode_envelope(body: &str, request: &QueryRequest) -> ResolveResult<QueryResult> {
    let envelope: SolrEnvelope = serde_json::from_str(body).map_err(|e| {
        ResolveError::UpstreamUnavailable(format!("Index response for '{}' not decodable: {}", request.expr, e))
    })?;

    if envelope.response_header.status != 0 {
        return Err(ResolveError::UpstreamUnavailable(format!(
            "Index query '{}' failed with status {}",
            request.expr, envelope.response_header.status
        )));
    }

    let response = envelope.response.ok_or_else(|| {
        ResolveError::UpstreamUnavailable(format!("Index response for '{}' has no result set", request.expr))
    })?;

    if response.num_found >= u64::from(request.rows) {
        return Err(ResolveError::Truncated {
            query: request.expr.clone(),
            rows: request.rows,
            num_found: response.num_found,
        });
    }

    Ok(QueryResult {
        docs: response.docs,
        num_found: response.num_found,
    })
}

/// `identifier:"<pid>"`
pub fn identifier_query(pid: &Pid) -> String {
    format!("identifier:\"{}\"", solr_phrase(pid.as_str()))
}

/// `resourceMap:"<pid>"`
pub fn resource_map_query(pid: &Pid) -> String {
    format!("resourceMap:\"{}\"", solr_phrase(pid.as_str()))
}

/// `identifier:("<a>" OR "<b>") AND -obsoletedBy:*`
pub fn non_obsolete_query(pids: &[Pid]) -> String {
    let terms: Vec<String> = pids
        .iter()
        .map(|pid| format!("\"{}\"", solr_phrase(pid.as_str())))
        .collect();
    format!("identifier:({}) AND -obsoletedBy:*", terms.join(" OR "))
}
