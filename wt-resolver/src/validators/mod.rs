//! Cross-source validation

pub mod consistency_verifier;

pub use consistency_verifier::verify;
