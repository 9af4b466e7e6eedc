use super::{require_key, send_json, FetchSettings, Pager, PaperSource, SourceError};
use crate::record::{join_authors, or_na, scalar_text, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const BASE_URL: &str = "https://api.core.ac.uk/v3/search/works";

/// CORE v3 works search, paged by item offset.
pub struct CoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    settings: FetchSettings,
}

impl CoreClient {
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
        offset: u32,
    ) -> Result<Vec<Record>, SourceError> {
        debug!(offset, "Requesting CORE page");
        let url = format!(
            "{}?apiKey={}&q={}&limit={}&offset={}",
            self.base_url,
            urlencoding::encode(api_key),
            query,
            self.settings.page_size,
            offset
        );
        let resp: CoreResponse = send_json(self.client.get(&url)).await?;
        Ok(resp.results.iter().map(core_to_record).collect())
    }
}

#[derive(Deserialize)]
struct CoreResponse {
    #[serde(default)]
    results: Vec<CoreWork>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreWork {
    title: Option<String>,
    authors: Option<Vec<CoreAuthor>>,
    year_published: Option<Value>,
    description: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct CoreAuthor {
    name: Option<String>,
}

fn core_to_record(w: &CoreWork) -> Record {
    let description = w
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| w.abstract_text.clone());
    Record {
        source: Source::Core,
        title: or_na(w.title.clone()),
        authors: join_authors(w.authors.iter().flatten().filter_map(|a| a.name.clone())),
        year: scalar_text(w.year_published.as_ref()),
        abstract_text: or_na(description),
        url: or_na(w.download_url.clone()),
    }
}

#[async_trait]
impl PaperSource for CoreClient {
    fn source(&self) -> Source {
        Source::Core
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let api_key = require_key(&self.api_key, "CORE_API_KEY")?;
        Pager::offsets(&self.settings)
            .run(Source::Core, sink, move |offset| self.fetch_page(query, api_key, offset))
            .await
    }
}
