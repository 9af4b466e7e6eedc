//! PubMed via NCBI E-utilities.
//!
//! Two requests per run: `esearch` returns the matching PMIDs as JSON, then
//! `efetch` returns full article records for exactly those PMIDs as XML.

use super::{send_json, send_text, FetchSettings, PaperSource, SourceError};
use crate::record::{join_authors, leading_year, or_na, squash_whitespace, Record, Source};
use crate::sink::RecordSink;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

pub const SEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const FETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

const ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

pub struct PubMedClient {
    client: reqwest::Client,
    search_url: String,
    fetch_url: String,
    api_key: Option<String>,
    settings: FetchSettings,
}

impl PubMedClient {
    pub fn new(
        client: reqwest::Client,
        search_url: impl Into<String>,
        fetch_url: impl Into<String>,
        api_key: Option<String>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            fetch_url: fetch_url.into(),
            api_key,
            settings,
        }
    }

    fn key_param(&self) -> String {
        self.api_key
            .as_ref()
            .map(|k| format!("&api_key={}", urlencoding::encode(k)))
            .unwrap_or_default()
    }

    async fn search_ids(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let url = format!(
            "{}?db=pubmed&retmode=json&retmax={}&term={}{}",
            self.search_url,
            self.settings.page_size,
            query,
            self.key_param()
        );
        let resp: ESearchResponse = send_json(self.client.get(&url)).await?;
        Ok(resp.esearchresult.map(|r| r.idlist).unwrap_or_default())
    }

    async fn fetch_articles(&self, ids: &[String]) -> Result<Vec<Record>, SourceError> {
        let url = format!(
            "{}?db=pubmed&id={}&retmode=xml{}",
            self.fetch_url,
            ids.join(","),
            self.key_param()
        );
        let body = send_text(self.client.get(&url)).await?;
        parse_efetch(&body)
    }
}

#[derive(Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[async_trait]
impl PaperSource for PubMedClient {
    fn source(&self) -> Source {
        Source::PubMed
    }

    async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
        if sink.is_full() {
            return Ok(());
        }
        let ids = self.search_ids(query).await?;
        debug!(count = ids.len(), "PubMed search returned ids");
        if ids.is_empty() || sink.is_full() {
            return Ok(());
        }
        let records = self.fetch_articles(&ids).await?;
        let appended = sink.extend_until_full(records);
        debug!(appended, "PubMed articles consumed");
        Ok(())
    }
}

#[derive(Default)]
struct Article {
    pmid: String,
    title: String,
    abstract_text: String,
    abstract_done: bool,
    year: String,
    medline_date: String,
    authors: Vec<String>,
    last_name: String,
    fore_name: String,
    collective_name: String,
}

impl Article {
    fn into_record(self) -> Record {
        let year = if self.year.trim().is_empty() {
            leading_year(Some(&self.medline_date))
        } else {
            self.year.trim().to_string()
        };
        let pmid = self.pmid.trim();
        Record {
            source: Source::PubMed,
            title: or_na(Some(squash_whitespace(&self.title))),
            authors: join_authors(self.authors),
            year,
            abstract_text: or_na(Some(squash_whitespace(&self.abstract_text))),
            url: if pmid.is_empty() {
                or_na(None)
            } else {
                format!("{}/{}", ARTICLE_URL, pmid)
            },
        }
    }

    fn finish_author(&mut self) {
        let name = if self.collective_name.trim().is_empty() {
            format!("{} {}", self.last_name.trim(), self.fore_name.trim())
        } else {
            self.collective_name.trim().to_string()
        };
        self.authors.push(name.trim().to_string());
        self.last_name.clear();
        self.fore_name.clear();
        self.collective_name.clear();
    }
}

fn parse_efetch(xml: &str) -> Result<Vec<Record>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut article: Option<Article> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "PubmedArticle" {
                    article = Some(Article::default());
                    path.clear();
                }
                path.push(tag);
            }
            Ok(Event::Text(e)) => {
                let Some(article) = article.as_mut() else { continue };
                let text = e
                    .unescape()
                    .map_err(|err| SourceError::Xml(err.to_string()))?;
                collect_text(article, &path, &text);
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                path.pop();
                match tag.as_str() {
                    "PubmedArticle" => {
                        if let Some(done) = article.take() {
                            records.push(done.into_record());
                        }
                    }
                    "AbstractText" => {
                        if let Some(a) = article.as_mut() {
                            a.abstract_done = true;
                        }
                    }
                    "Author" if in_author_list(&path) => {
                        if let Some(a) = article.as_mut() {
                            a.finish_author();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(records)
}

fn in_author_list(path: &[String]) -> bool {
    path.last().is_some_and(|p| p == "AuthorList")
}

fn has(path: &[String], tag: &str) -> bool {
    path.iter().any(|p| p == tag)
}

fn parent_is(path: &[String], tag: &str) -> bool {
    path.len() >= 2 && path[path.len() - 2] == tag
}

fn collect_text(article: &mut Article, path: &[String], text: &str) {
    let Some(leaf) = path.last().map(String::as_str) else { return };

    if leaf == "PMID" && parent_is(path, "MedlineCitation") && article.pmid.is_empty() {
        article.pmid.push_str(text);
    } else if has(path, "ArticleTitle") {
        article.title.push_str(text);
    } else if has(path, "AbstractText") && !article.abstract_done {
        article.abstract_text.push_str(text);
    } else if has(path, "PubDate") && leaf == "Year" {
        article.year.push_str(text);
    } else if has(path, "PubDate") && leaf == "MedlineDate" {
        article.medline_date.push_str(text);
    } else if has(path, "AuthorList") && parent_is(path, "Author") {
        match leaf {
            "LastName" => article.last_name.push_str(text),
            "ForeName" => article.fore_name.push_str(text),
            "CollectiveName" => article.collective_name.push_str(text),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31452104</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2019</Year><Month>Aug</Month></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Screening <i>in vivo</i> models.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">First part.</AbstractText>
          <AbstractText Label="METHODS">Second part.</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>John</ForeName><Initials>J</Initials></Author>
          <Author ValidYN="Y"><CollectiveName>PubMed Study Group</CollectiveName></Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites"><PMID Version="1">111</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">22222</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
        <ArticleTitle>Second &amp; last</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch() {
        let records = parse_efetch(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let r = &records[0];
        assert_eq!(r.source, Source::PubMed);
        assert_eq!(r.title, "Screening in vivo models.");
        assert_eq!(r.year, "2019");
        assert_eq!(r.abstract_text, "First part.");
        assert_eq!(r.authors, "Smith John, PubMed Study Group");
        assert_eq!(r.url, "https://pubmed.ncbi.nlm.nih.gov/31452104");

        let r = &records[1];
        assert_eq!(r.title, "Second & last");
        assert_eq!(r.year, "1998");
        assert_eq!(r.abstract_text, "N/A");
        assert_eq!(r.authors, "N/A");
        assert_eq!(r.url, "https://pubmed.ncbi.nlm.nih.gov/22222");
    }

    #[test]
    fn test_parse_empty_set() {
        assert!(parse_efetch("<PubmedArticleSet></PubmedArticleSet>").unwrap().is_empty());
    }

    #[test]
    fn test_esearch_missing_idlist() {
        let resp: ESearchResponse =
            serde_json::from_str(r#"{"header": {}, "esearchresult": {"count": "0"}}"#).unwrap();
        assert!(resp.esearchresult.unwrap().idlist.is_empty());
    }
}
