use super::{require_key, send_json, FetchSettings, PaperSource, SourceError};
use crate::record::{leading_year, or_na, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub const BASE_URL: &str = "https://api.elsevier.com/content/search/scopus";

/// Elsevier Scopus search. One batch per run, key sent as a header.
pub struct ScopusClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    settings: FetchSettings,
}

impl ScopusClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            settings,
        }
    }
}

#[derive(Deserialize)]
struct ScopusResponse {
    #[serde(rename = "search-results")]
    search_results: Option<ScopusResults>,
}

#[derive(Deserialize)]
struct ScopusResults {
    #[serde(default)]
    entry: Vec<ScopusEntry>,
}

#[derive(Deserialize)]
struct ScopusEntry {
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "dc:creator")]
    creator: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "dc:description")]
    description: Option<String>,
    #[serde(rename = "prism:url")]
    url: Option<String>,
    // Present on the placeholder entry Scopus returns for an empty result set.
    error: Option<String>,
}

fn entry_to_record(e: &ScopusEntry) -> Record {
    Record {
        source: Source::Scopus,
        title: or_na(e.title.clone()),
        authors: or_na(e.creator.clone()),
        year: leading_year(e.cover_date.as_deref()),
        abstract_text: or_na(e.description.clone()),
        url: or_na(e.url.clone()),
    }
}

fn parse_entries(resp: ScopusResponse) -> Vec<Record> {
    resp.search_results
        .map(|r| r.entry)
        .unwrap_or_default()
        .iter()
        .filter(|e| e.error.is_none())
        .map(entry_to_record)
        .collect()
}

#[async_trait]
impl PaperSource for ScopusClient {
    fn source(&self) -> Source {
        Source::Scopus
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let api_key = require_key(&self.api_key, "SCOPUS_API_KEY")?;
        let url = format!("{}?query={}&count={}", self.base_url, query, self.settings.page_size);
        let resp: ScopusResponse = send_json(
            self.client
                .get(&url)
                .header("X-ELS-APIKey", api_key)
                .header("Accept", "application/json"),
        )
        .await?;
        let records = parse_entries(resp);
        let appended = sink.extend_until_full(records);
        debug!(appended, "Scopus batch consumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopus_mapping() {
        let body = r#"{
          "search-results": {
            "opensearch:totalResults": "1",
            "entry": [
              {
                "dc:title": "Deep learning in radiology",
                "dc:creator": "Smith J.",
                "prism:coverDate": "2020-11-01",
                "prism:url": "https://api.elsevier.com/content/abstract/scopus_id/1"
              }
            ]
          }
        }"#;
        let records = parse_entries(serde_json::from_str(body).unwrap());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.authors, "Smith J.");
        assert_eq!(r.year, "2020");
        assert_eq!(r.abstract_text, "N/A");
    }

    #[test]
    fn test_scopus_empty_placeholder_skipped() {
        let body = r#"{
          "search-results": {
            "opensearch:totalResults": "0",
            "entry": [{"@_fa": "true", "error": "Result set was empty"}]
          }
        }"#;
        assert!(parse_entries(serde_json::from_str(body).unwrap()).is_empty());
    }
}
