//! Identifier normalization
//!
//! Turns a loosely specified dataset reference (landing-page URL, resolve or
//! object URI, anything containing a DOI, or an already canonical PID) into a
//! canonical [`Pid`]. Pure string transform: no network access, never fails.
//!
//! # Rules, in priority order
//! 1. Strip a landing-page prefix (`https://search.dataone.org/#view/`)
//! 2. Strip a resolve/object URI prefix (`https://cn.dataone.org/cn/v2/resolve/`)
//! 3. If a DOI-shaped substring is present, return `doi:<match>`
//! 4. Otherwise return the input unchanged
//!
//! A stripped remainder is percent-decoded and then still subject to rule 3,
//! which keeps `normalize(normalize(x)) == normalize(x)` for every input.
//! Rule 3 leaves PIDs that already end in `doi:<DOI>` alone, so
//! `resource_map_doi:10.18739/A2KK3F` is never rewritten to its metadata DOI.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::types::Pid;
use regex::Regex;
use std::borrow::Cow;

/// Crossref's recommended DOI pattern
const DOI_PATTERN: &str = r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+";

/// A whole PID in DataONE's `<prefix>doi:<DOI>` form
const DOI_PID_PATTERN: &str = r"(?i)^[a-z0-9_.-]*doi:10\.\d{4,9}/[-._;()/:A-Z0-9]+$";

/// Compiled normalization patterns
#[derive(Debug, Clone)]
pub struct IdentifierNormalizer {
    landing_page: Regex,
    resolve_uri: Regex,
    doi: Regex,
    doi_pid: Regex,
}

impl IdentifierNormalizer {
    /// Compile the configured prefix patterns
    pub fn new(config: &ResolverConfig) -> ResolveResult<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ResolveError::Config(format!("Invalid {} pattern: {}", name, e)))
        };

        Ok(Self {
            landing_page: compile("landing page", &config.landing_page_pattern)?,
            resolve_uri: compile("resolve URI", &config.resolve_uri_pattern)?,
            doi: compile("DOI", DOI_PATTERN)?,
            doi_pid: compile("DOI PID", DOI_PID_PATTERN)?,
        })
    }

    /// Normalize a raw reference into a canonical PID
    pub fn normalize(&self, reference: &str) -> Pid {
        let reference = reference.trim();

        let mut remainder = reference;
        let mut stripped = false;
        while let Some(rest) = self.strip_prefix(remainder) {
            remainder = rest;
            stripped = true;
        }

        let candidate: Cow<'_, str> = if stripped {
            urlencoding::decode(remainder).unwrap_or(Cow::Borrowed(remainder))
        } else {
            Cow::Borrowed(reference)
        };

        if self.doi_pid.is_match(&candidate) {
            return Pid::new(candidate.into_owned());
        }
        match self.doi.find(&candidate) {
            Some(m) => Pid::new(format!("doi:{}", m.as_str())),
            None => Pid::new(candidate.into_owned()),
        }
    }

    fn strip_prefix<'a>(&self, value: &'a str) -> Option<&'a str> {
        let m = self
            .landing_page
            .find(value)
            .or_else(|| self.resolve_uri.find(value))?;

        // Empty matches would never make progress
        if m.end() == 0 {
            return None;
        }
        Some(&value[m.end()..])
    }
}

/// Escape a value for use inside a quoted Solr phrase
pub fn solr_phrase(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Undo form-style URL escaping (`+` for space, `%XX` sequences)
///
/// Applied to identifiers from both the graph and the index so they compare
/// on equal terms.
pub fn unescape_pid(value: &str) -> String {
    let spaced = value.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
