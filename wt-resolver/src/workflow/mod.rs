//! Resolution workflows
//!
//! - **package_tree** - one reference to a full nested package tree
//! - **batch_resolver** - many references to flat summary records

pub mod batch_resolver;
pub mod package_tree;

pub use batch_resolver::{BatchReport, BatchResolver, LookupFailure};
pub use package_tree::PackageTreeBuilder;
