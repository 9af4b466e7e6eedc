use std::fmt;
use std::str::FromStr;

/// Placeholder written for any field a provider did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Provider a record was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Springer,
    Core,
    Arxiv,
    SemanticScholar,
    Scopus,
    OpenAlex,
    PubMed,
    Crossref,
}

impl Source {
    /// Every provider, in the order a run visits them.
    pub const ALL: [Source; 8] = [
        Source::Springer,
        Source::Core,
        Source::Arxiv,
        Source::SemanticScholar,
        Source::Scopus,
        Source::OpenAlex,
        Source::PubMed,
        Source::Crossref,
    ];

    /// Label written into the `source` column.
    pub fn label(self) -> &'static str {
        match self {
            Source::Springer => "Springer",
            Source::Core => "CORE",
            Source::Arxiv => "arXiv",
            Source::SemanticScholar => "Semantic Scholar",
            Source::Scopus => "Scopus",
            Source::OpenAlex => "OpenAlex",
            Source::PubMed => "PubMed",
            Source::Crossref => "Crossref",
        }
    }

    /// Short name used in `LITSCREEN_SOURCES` and `--sources`.
    pub fn key(self) -> &'static str {
        match self {
            Source::Springer => "springer",
            Source::Core => "core",
            Source::Arxiv => "arxiv",
            Source::SemanticScholar => "semantic_scholar",
            Source::Scopus => "scopus",
            Source::OpenAlex => "openalex",
            Source::PubMed => "pubmed",
            Source::Crossref => "crossref",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        Source::ALL
            .into_iter()
            .find(|src| src.key() == wanted)
            .ok_or_else(|| format!("unknown source: {}", s.trim()))
    }
}

/// One normalized row of the screening table.
///
/// Every field is always populated; missing provider data is stored as
/// [`NOT_AVAILABLE`] so the exported table stays rectangular.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub source: Source,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub abstract_text: String,
    pub url: String,
}

impl Record {
    /// Column names in export order.
    pub const COLUMNS: [&'static str; 6] =
        ["source", "title", "authors", "year", "abstract", "url"];

    /// A record with every field set to the sentinel.
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            title: NOT_AVAILABLE.to_string(),
            authors: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            abstract_text: NOT_AVAILABLE.to_string(),
            url: NOT_AVAILABLE.to_string(),
        }
    }

    /// Field values in [`Record::COLUMNS`] order.
    pub fn as_row(&self) -> [&str; 6] {
        [
            self.source.label(),
            &self.title,
            &self.authors,
            &self.year,
            &self.abstract_text,
            &self.url,
        ]
    }
}

/// Text value or the sentinel when absent or blank.
pub fn or_na(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Join author names in source order; blank names are skipped.
pub fn join_authors<I>(names: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let joined = names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    or_na(Some(joined))
}

/// Leading four characters of a date string ("2021-03-04" -> "2021").
pub fn leading_year(date: Option<&str>) -> String {
    match date.map(str::trim) {
        Some(d) if !d.is_empty() => d.chars().take(4).collect(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Render a JSON scalar as text; strings and numbers pass, everything else is
/// the sentinel.
pub fn scalar_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => or_na(Some(s.clone())),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_record_is_all_sentinel() {
        let r = Record::empty(Source::Scopus);
        assert_eq!(r.as_row(), ["Scopus", "N/A", "N/A", "N/A", "N/A", "N/A"]);
    }

    #[test]
    fn test_or_na_blank() {
        assert_eq!(or_na(None), "N/A");
        assert_eq!(or_na(Some("   ".into())), "N/A");
        assert_eq!(or_na(Some("Title".into())), "Title");
    }

    #[test]
    fn test_join_authors() {
        let names = vec!["Ada Lovelace".to_string(), " ".to_string(), "Alan Turing".to_string()];
        assert_eq!(join_authors(names), "Ada Lovelace, Alan Turing");
        assert_eq!(join_authors(Vec::<String>::new()), "N/A");
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year(Some("2021-03-04")), "2021");
        assert_eq!(leading_year(Some("99")), "99");
        assert_eq!(leading_year(Some("")), "N/A");
        assert_eq!(leading_year(None), "N/A");
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(Some(&json!(2019))), "2019");
        assert_eq!(scalar_text(Some(&json!("2019"))), "2019");
        assert_eq!(scalar_text(Some(&json!(null))), "N/A");
        assert_eq!(scalar_text(Some(&json!([2019]))), "N/A");
        assert_eq!(scalar_text(None), "N/A");
    }

    #[test]
    fn test_source_keys_round_trip() {
        for src in Source::ALL {
            assert_eq!(src.key().parse::<Source>().unwrap(), src);
        }
        assert_eq!("Semantic-Scholar".parse::<Source>().unwrap(), Source::SemanticScholar);
        assert!("scholar".parse::<Source>().is_err());
    }
}
