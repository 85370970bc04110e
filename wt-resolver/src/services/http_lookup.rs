//! Plain HTTP lookup strategy
//!
//! Treats an `http`/`https` reference as a single downloadable file and
//! describes it from the headers of a `HEAD` request. The body is never
//! fetched.

use crate::error::{ResolveError, ResolveResult};
use crate::services::LookupStrategy;
use crate::types::{DataMapRecord, Repository};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Url;

/// Media types accepted as a downloadable file
const FILE_MEDIA_TYPES: &[&str] = &["application/octet-stream", "text/plain"];

const FILENAME_PATTERN: &str = r#"filename="?([^";]+)"?"#;

pub struct HttpLookup {
    http_client: reqwest::Client,
    filename: Regex,
}

impl HttpLookup {
    pub fn new(http_client: reqwest::Client) -> ResolveResult<Self> {
        let filename = Regex::new(FILENAME_PATTERN)
            .map_err(|e| ResolveError::Config(format!("Invalid filename pattern: {}", e)))?;
        Ok(Self { http_client, filename })
    }

    /// Name from `Content-Disposition`, else the last URL path segment
    fn file_name(&self, url: &Url, headers: &HeaderMap) -> String {
        let from_header = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| self.filename.captures(v))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty());

        from_header
            .or_else(|| {
                url.path_segments()
                    .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                    .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
            })
            .unwrap_or_else(|| url.as_str().to_string())
    }
}

#[async_trait]
impl LookupStrategy for HttpLookup {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn lookup(&self, reference: &str) -> ResolveResult<Option<DataMapRecord>> {
        let url = match Url::parse(reference.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Ok(None),
        };

        let response = self
            .http_client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| ResolveError::UpstreamUnavailable(format!("HEAD {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::NotFound(format!("HEAD {} returned HTTP {}", url, status.as_u16())));
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let essence = media_type_essence(content_type);
        if !FILE_MEDIA_TYPES.contains(&essence.as_str()) {
            return Err(ResolveError::NotFound(format!(
                "{} is not a downloadable file (content type '{}')",
                url, content_type
            )));
        }

        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ResolveError::NotFound(format!("{} reports no content length", url)))?;

        let name = self.file_name(&url, headers);

        tracing::debug!(url = %url, name = %name, size, "HTTP lookup succeeded");

        Ok(Some(DataMapRecord {
            data_id: reference.trim().to_string(),
            doi: "unknown".to_string(),
            name,
            repository: Repository::Http,
            size,
        }))
    }
}

/// `text/plain; charset=utf-8` -> `text/plain`
fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
