use super::{send_text, FetchSettings, Pager, PaperSource, SourceError};
use crate::record::{join_authors, leading_year, or_na, squash_whitespace, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

pub const BASE_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    settings: FetchSettings,
}

impl ArxivClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            settings,
        }
    }

    async fn fetch_page(&self, query: &str, start: u32) -> Result<Vec<Record>, SourceError> {
        debug!(start, "Requesting arXiv page");
        let url = format!(
            "{}?search_query=all:{}&start={}&max_results={}",
            self.base_url, query, start, self.settings.page_size
        );
        let body = send_text(self.client.get(&url)).await?;
        parse_atom_feed(&body)
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        Pager::offsets(&self.settings)
            .run(Source::Arxiv, sink, move |start| self.fetch_page(query, start))
            .await
    }
}

#[derive(Default)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
}

impl Entry {
    fn into_record(self) -> Record {
        Record {
            source: Source::Arxiv,
            title: or_na(Some(squash_whitespace(&self.title))),
            authors: join_authors(self.authors),
            year: leading_year(Some(&self.published)),
            abstract_text: or_na(Some(squash_whitespace(&self.summary))),
            url: or_na(Some(self.id.trim().to_string())),
        }
    }
}

fn parse_atom_feed(xml: &str) -> Result<Vec<Record>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut current_tag = String::new();
    let mut in_author = false;
    let mut author_name = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "entry" {
                    entry = Some(Entry::default());
                } else if entry.is_some() {
                    if tag == "author" {
                        in_author = true;
                        author_name.clear();
                    }
                    current_tag = tag;
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(entry) = entry.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| SourceError::Xml(err.to_string()))?;
                    match current_tag.as_str() {
                        "title" => entry.title.push_str(&text),
                        "summary" => entry.summary.push_str(&text),
                        "id" => entry.id.push_str(&text),
                        "published" => entry.published.push_str(&text),
                        "name" if in_author => author_name.push_str(&text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(done) = entry.take() {
                        if done.id.contains("/api/errors") {
                            return Err(SourceError::Api(squash_whitespace(&done.summary)));
                        }
                        records.push(done.into_record());
                    }
                } else if tag == "author" && in_author {
                    in_author = false;
                    if let Some(entry) = entry.as_mut() {
                        entry.authors.push(author_name.trim().to_string());
                    }
                }
                if tag == current_tag {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(records)
}
