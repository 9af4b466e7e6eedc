pub mod arxiv;
pub mod core_ac;
pub mod crossref;
pub mod openalex;
pub mod pubmed;
pub mod scopus;
pub mod semantic_scholar;
pub mod springer;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::record::{Record, Source};
use crate::sink::RecordSink;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Missing API key: {0}")]
    MissingKey(String),
}

/// A scholarly provider that can append normalized records for a query.
///
/// `query` is already percent-encoded. Implementations must not issue any
/// request once `sink.is_full()`, must stop appending the moment the quota is
/// met, and report transport or parse failures as `Err` while leaving records
/// appended so far in place.
#[async_trait]
pub trait PaperSource: Send + Sync {
    fn source(&self) -> Source;

    fn name(&self) -> &str {
        self.source().label()
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError>;
}

/// Request shaping shared by every adapter.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Items requested per page or batch.
    pub page_size: u32,
    /// Pause between successive pages of a paginated provider.
    pub page_delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_delay: Duration::from_secs(5),
        }
    }
}

/// Cursor walk for providers that paginate until the quota is met.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pager {
    first: u32,
    step: u32,
    delay: Duration,
}

impl Pager {
    /// Zero-based item offset advanced by the page size.
    pub(crate) fn offsets(settings: &FetchSettings) -> Self {
        Self {
            first: 0,
            step: settings.page_size,
            delay: settings.page_delay,
        }
    }

    /// One-based page counter advanced by one.
    pub(crate) fn pages(settings: &FetchSettings) -> Self {
        Self {
            first: 1,
            step: 1,
            delay: settings.page_delay,
        }
    }

    /// Request pages until the sink is full, a page comes back empty, or a
    /// request fails.
    pub(crate) async fn run<F, Fut>(
        &self,
        source: Source,
        sink: &mut RecordSink,
        mut fetch_page: F,
    ) -> Result<(), SourceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<Record>, SourceError>>,
    {
        let mut cursor = self.first;
        let mut requested = false;
        while !sink.is_full() {
            if requested && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            requested = true;

            let page = fetch_page(cursor).await?;
            if page.is_empty() {
                debug!(source = %source, cursor, "Empty page, provider exhausted");
                break;
            }
            let received = page.len();
            let appended = sink.extend_until_full(page);
            debug!(source = %source, cursor, received, appended, "Page consumed");
            cursor = match cursor.checked_add(self.step) {
                Some(next) => next,
                None => {
                    debug!(source = %source, cursor, "Cursor exhausted");
                    break;
                }
            };
        }
        Ok(())
    }
}

/// Send a request and return the body of a 2xx response.
pub(crate) async fn send_text(request: reqwest::RequestBuilder) -> Result<String, SourceError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            message: body.trim().chars().take(200).collect(),
        });
    }
    Ok(resp.text().await?)
}

pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let body = send_text(request).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Returns the configured key or a `MissingKey` error naming its variable.
pub(crate) fn require_key<'a>(key: &'a Option<String>, var: &str) -> Result<&'a str, SourceError> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| SourceError::MissingKey(var.to_string()))
}
