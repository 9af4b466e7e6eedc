use super::{send_json, FetchSettings, PaperSource, SourceError};
use crate::record::{join_authors, or_na, scalar_text, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const BASE_URL: &str = "https://api.openalex.org/works";

pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    settings: FetchSettings,
}

impl OpenAlexClient {
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

    fn search_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}?search={}&per-page={}",
            self.base_url, query, self.settings.page_size
        );
        if let Some(ref email) = self.mailto {
            url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
        }
        url
    }
}

#[derive(Deserialize)]
struct OAResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Deserialize)]
struct OAWork {
    id: Option<String>,
    title: Option<String>,
    authorships: Option<Vec<OAAuthorship>>,
    publication_year: Option<Value>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Deserialize)]
struct OAAuthorship {
    author: Option<OAAuthor>,
}

#[derive(Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

/// OpenAlex ships abstracts as word -> positions; put the words back in order.
fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut words: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}

fn oa_to_record(w: &OAWork) -> Record {
    Record {
        source: Source::OpenAlex,
        title: or_na(w.title.clone()),
        authors: join_authors(
            w.authorships
                .iter()
                .flatten()
                .filter_map(|a| a.author.as_ref())
                .filter_map(|a| a.display_name.clone()),
        ),
        year: scalar_text(w.publication_year.as_ref()),
        abstract_text: or_na(w.abstract_inverted_index.as_ref().map(reconstruct_abstract)),
        url: or_na(w.id.clone()),
    }
}

#[async_trait]
impl PaperSource for OpenAlexClient {
    fn source(&self) -> Source {
        Source::OpenAlex
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let resp: OAResponse = send_json(self.client.get(self.search_url(query))).await?;
        let appended = sink.extend_until_full(resp.results.iter().map(oa_to_record));
        debug!(appended, "OpenAlex batch consumed");
        Ok(())
    }
}
