use super::{send_json, FetchSettings, Pager, PaperSource, SourceError};
use crate::record::{join_authors, or_na, scalar_text, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const FIELDS: &str = "title,abstract,authors,year,url";

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    settings: FetchSettings,
}

impl SemanticScholarClient {
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

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    async fn fetch_page(&self, query: &str, offset: u32) -> Result<Vec<Record>, SourceError> {
        debug!(offset, "Requesting Semantic Scholar page");
        let url = format!(
            "{}?query={}&limit={}&offset={}&fields={}",
            self.base_url, query, self.settings.page_size, offset, FIELDS
        );
        let req = self.add_auth(self.client.get(&url).header("Accept", "application/json"));
        let resp: S2SearchResponse = send_json(req).await?;
        Ok(resp.data.unwrap_or_default().iter().map(s2_to_record).collect())
    }
}

#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2Paper>>,
}

#[derive(Deserialize)]
struct S2Paper {
    title: Option<String>,
    authors: Option<Vec<S2Author>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<Value>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

fn s2_to_record(p: &S2Paper) -> Record {
    Record {
        source: Source::SemanticScholar,
        title: or_na(p.title.clone()),
        authors: join_authors(p.authors.iter().flatten().filter_map(|a| a.name.clone())),
        year: scalar_text(p.year.as_ref()),
        abstract_text: or_na(p.abstract_text.clone()),
        url: or_na(p.url.clone()),
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    fn source(&self) -> Source {
        Source::SemanticScholar
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        Pager::offsets(&self.settings)
            .run(Source::SemanticScholar, sink, move |offset| self.fetch_page(query, offset))
            .await
    }
}
