use super::{require_key, send_json, FetchSettings, Pager, PaperSource, SourceError};
use crate::record::{join_authors, leading_year, or_na, Record, Source, NOT_AVAILABLE};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const BASE_URL: &str = "https://api.springernature.com/meta/v2/json";

/// Springer Nature metadata API, paged with a 1-based page counter.
pub struct SpringerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    settings: FetchSettings,
}

impl SpringerClient {
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

    async fn fetch_page(
        &self,
        query: &str,
        api_key: &str,
        page: u32,
    ) -> Result<Vec<Record>, SourceError> {
        debug!(page, "Requesting Springer page");
        let url = format!(
            "{}?q={}&api_key={}&p={}&s={}",
            self.base_url,
            query,
            urlencoding::encode(api_key),
            self.settings.page_size,
            page
        );
        let resp: SpringerResponse = send_json(self.client.get(&url)).await?;
        Ok(resp.records.iter().map(springer_to_record).collect())
    }
}

#[derive(Deserialize)]
struct SpringerResponse {
    #[serde(default)]
    records: Vec<SpringerRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpringerRecord {
    title: Option<String>,
    creators: Option<Vec<SpringerCreator>>,
    publication_date: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<Value>,
    url: Option<Vec<SpringerUrl>>,
}

#[derive(Deserialize)]
struct SpringerCreator {
    creator: Option<String>,
}

#[derive(Deserialize)]
struct SpringerUrl {
    value: Option<String>,
}

/// The abstract is either plain text or a `{ "h1": ..., "p": ... }` block.
fn abstract_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => or_na(Some(s.clone())),
        Some(Value::Object(obj)) => match obj.get("p") {
            Some(Value::String(p)) => or_na(Some(p.clone())),
            Some(Value::Array(parts)) => or_na(Some(
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            )),
            _ => NOT_AVAILABLE.to_string(),
        },
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn springer_to_record(r: &SpringerRecord) -> Record {
    Record {
        source: Source::Springer,
        title: or_na(r.title.clone()),
        authors: join_authors(
            r.creators
                .iter()
                .flatten()
                .filter_map(|c| c.creator.clone()),
        ),
        year: leading_year(r.publication_date.as_deref()),
        abstract_text: abstract_text(r.abstract_text.as_ref()),
        url: or_na(r.url.as_ref().and_then(|u| u.first()).and_then(|u| u.value.clone())),
    }
}

#[async_trait]
impl PaperSource for SpringerClient {
    fn source(&self) -> Source {
        Source::Springer
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let api_key = require_key(&self.api_key, "SPRINGER_API_KEY")?;
        Pager::pages(&self.settings)
            .run(Source::Springer, sink, move |page| self.fetch_page(query, api_key, page))
            .await
    }
}
