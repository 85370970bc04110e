//! Core types for dataset resolution
//!
//! Everything here is created fresh per resolution call and is immutable
//! once returned. Nothing is persisted by this crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Persistent identifier (`doi:...`, `urn:uuid:...`, `resource_map_...`)
///
/// Opaque: the resolver never interprets its structure after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Pid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Pid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Index documents
// ============================================================================

/// One search-index record, discriminated by its `formatType` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formatType", rename_all = "UPPERCASE")]
pub enum IndexDocument {
    /// Science metadata; `documents` marks the package's documenting metadata
    Metadata(MetadataDocument),
    /// A data file
    Data(DataDocument),
    /// A nested package (resource map)
    Resource(ResourceDocument),
}

/// Metadata document fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    pub identifier: Pid,
    pub title: Option<String>,
    pub size: Option<u64>,
    pub file_name: Option<String>,
    pub format_id: Option<String>,
    /// Every PID aggregated by the package, including this document
    pub documents: Option<Vec<Pid>>,
    #[serde(default, rename = "resourceMap")]
    pub resource_maps: Vec<Pid>,
}

/// Data document fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDocument {
    pub identifier: Pid,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub format_id: Option<String>,
    #[serde(default, rename = "resourceMap")]
    pub resource_maps: Vec<Pid>,
}

/// Resource map document fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    pub identifier: Pid,
    #[serde(default, rename = "resourceMap")]
    pub resource_maps: Vec<Pid>,
}

impl IndexDocument {
    pub fn identifier(&self) -> &Pid {
        match self {
            IndexDocument::Metadata(doc) => &doc.identifier,
            IndexDocument::Data(doc) => &doc.identifier,
            IndexDocument::Resource(doc) => &doc.identifier,
        }
    }

    /// Candidate packages aggregating this document
    pub fn resource_maps(&self) -> &[Pid] {
        match self {
            IndexDocument::Metadata(doc) => &doc.resource_maps,
            IndexDocument::Data(doc) => &doc.resource_maps,
            IndexDocument::Resource(doc) => &doc.resource_maps,
        }
    }

    /// Raw `formatType` value
    pub fn format_type(&self) -> &'static str {
        match self {
            IndexDocument::Metadata(_) => "METADATA",
            IndexDocument::Data(_) => "DATA",
            IndexDocument::Resource(_) => "RESOURCE",
        }
    }
}

/// Index query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Solr query expression (already escaped)
    pub expr: String,
    /// Requested field list
    pub fields: Vec<String>,
    pub rows: u32,
    pub start: u32,
}

impl QueryRequest {
    /// Page size used when none is configured
    pub const DEFAULT_ROWS: u32 = 1000;

    pub fn new(expr: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            expr: expr.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows: Self::DEFAULT_ROWS,
            start: 0,
        }
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }
}

/// Decoded index query result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub docs: Vec<IndexDocument>,
    pub num_found: u64,
}

// ============================================================================
// Graph
// ============================================================================

/// Relations extracted from a package's resource map graph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    /// Every PID related by `ore:aggregates`
    pub membership: BTreeSet<Pid>,
    /// Every PID related by `cito:isDocumentedBy`
    pub documenting: BTreeSet<Pid>,
}

// ============================================================================
// Package tree
// ============================================================================

/// One file in a package node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Size in bytes (0 when the index has none)
    pub size: u64,
    /// PID of the underlying object
    pub identifier: Pid,
    /// Resolve URL for fetching the bytes
    pub url: String,
    /// Format identifier reported by the index
    pub mime_type: Option<String>,
}

/// A named package with its files and nested sub-packages
///
/// Built bottom-up; children are owned values, never shared with siblings
/// or parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    /// Title of the documenting metadata
    pub name: String,
    /// Resource map PID of this package
    pub identifier: Pid,
    pub file_list: BTreeMap<String, FileEntry>,
    pub children: BTreeMap<String, PackageNode>,
}

impl PackageNode {
    pub fn child(&self, name: &str) -> Option<&PackageNode> {
        self.children.get(name)
    }

    /// Number of files in this node and all descendants
    pub fn file_count(&self) -> usize {
        self.file_list.len()
            + self
                .children
                .values()
                .map(PackageNode::file_count)
                .sum::<usize>()
    }

    /// Total bytes in this node and all descendants
    pub fn total_size(&self) -> u64 {
        self.file_list.values().map(|f| f.size).sum::<u64>()
            + self
                .children
                .values()
                .map(PackageNode::total_size)
                .sum::<u64>()
    }

    /// 1 for a leaf package
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .values()
            .map(PackageNode::depth)
            .max()
            .unwrap_or(0)
    }
}

// ============================================================================
// Batch lookup records
// ============================================================================

/// Repository a record was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Repository {
    #[serde(rename = "DataONE")]
    DataOne,
    #[serde(rename = "HTTP")]
    Http,
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repository::DataOne => f.write_str("DataONE"),
            Repository::Http => f.write_str("HTTP"),
        }
    }
}

/// Flattened summary of one resolved reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapRecord {
    /// Package PID (DataONE) or the URL itself (HTTP)
    pub data_id: String,
    /// DOI without the `doi:` prefix, or `unknown`
    pub doi: String,
    pub name: String,
    pub repository: Repository,
    /// Size in bytes, -1 when unknown
    pub size: i64,
}
