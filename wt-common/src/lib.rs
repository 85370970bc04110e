//! # WholeTale Common Library
//!
//! Shared code for the WholeTale dataset tooling:
//! - Error types
//! - Configuration loading (TOML file, environment overrides, built-in defaults)

pub mod config;
pub mod error;

pub use error::{Error, Result};
