use super::{send_json, FetchSettings, PaperSource, SourceError};
use crate::record::{join_authors, or_na, scalar_text, Record, Source, NOT_AVAILABLE};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const BASE_URL: &str = "https://api.crossref.org/works";

pub struct CrossRefClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    settings: FetchSettings,
}

impl CrossRefClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        mailto: Option<String>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            mailto,
            settings,
        }
    }
}

#[derive(Deserialize)]
struct CRResponse {
    message: Option<CRMessage>,
}

#[derive(Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Deserialize)]
struct CRItem {
    #[serde(rename = "URL")]
    url: Option<String>,
    title: Option<Vec<String>>,
    author: Option<Vec<CRAuthor>>,
    #[serde(rename = "published-print")]
    published_print: Option<CRDate>,
    issued: Option<CRDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
}

#[derive(Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Value>,
}

/// First element of the first `date-parts` entry, as text.
fn first_date_part(date: Option<&CRDate>) -> Option<String> {
    let first = date?
        .date_parts
        .as_ref()?
        .as_array()?
        .first()?
        .as_array()?
        .first()
        .cloned();
    Some(scalar_text(first.as_ref())).filter(|year| year != NOT_AVAILABLE)
}

fn item_to_record(item: &CRItem) -> Record {
    let year = first_date_part(item.published_print.as_ref())
        .or_else(|| first_date_part(item.issued.as_ref()));
    Record {
        source: Source::Crossref,
        title: or_na(item.title.as_ref().and_then(|t| t.first()).cloned()),
        authors: join_authors(item.author.iter().flatten().map(|a| {
            format!(
                "{} {}",
                a.given.as_deref().unwrap_or(""),
                a.family.as_deref().unwrap_or("")
            )
        })),
        year: or_na(year),
        abstract_text: or_na(item.abstract_text.clone()),
        url: or_na(item.url.clone()),
    }
}

#[async_trait]
impl PaperSource for CrossRefClient {
    fn source(&self) -> Source {
        Source::Crossref
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let mut url = format!("{}?query={}&rows={}", self.base_url, query, self.settings.page_size);
        if let Some(ref email) = self.mailto {
            url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
        }
        let resp: CRResponse = send_json(self.client.get(&url)).await?;
        let items = resp.message.map(|m| m.items).unwrap_or_default();
        let appended = sink.extend_until_full(items.iter().map(item_to_record));
        debug!(appended, "Crossref batch consumed");
        Ok(())
    }
}
