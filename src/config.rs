use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::apis::{self, FetchSettings, PaperSource};
use crate::record::Source;

const USER_AGENT: &str = concat!("litscreen/", env!("CARGO_PKG_VERSION"));

/// Provider endpoints. Defaults are the public APIs; [`Endpoints::rooted_at`]
/// points every provider at one base URL (mirrors, local mocks).
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub springer: String,
    pub core: String,
    pub arxiv: String,
    pub semantic_scholar: String,
    pub scopus: String,
    pub openalex: String,
    pub pubmed_search: String,
    pub pubmed_fetch: String,
    pub crossref: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            springer: apis::springer::BASE_URL.into(),
            core: apis::core_ac::BASE_URL.into(),
            arxiv: apis::arxiv::BASE_URL.into(),
            semantic_scholar: apis::semantic_scholar::BASE_URL.into(),
            scopus: apis::scopus::BASE_URL.into(),
            openalex: apis::openalex::BASE_URL.into(),
            pubmed_search: apis::pubmed::SEARCH_URL.into(),
            pubmed_fetch: apis::pubmed::FETCH_URL.into(),
            crossref: apis::crossref::BASE_URL.into(),
        }
    }
}

impl Endpoints {
    /// `{base}/springer`, `{base}/core`, ... `{base}/pubmed/esearch`, `{base}/pubmed/efetch`.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            springer: format!("{}/springer", base),
            core: format!("{}/core", base),
            arxiv: format!("{}/arxiv", base),
            semantic_scholar: format!("{}/semantic_scholar", base),
            scopus: format!("{}/scopus", base),
            openalex: format!("{}/openalex", base),
            pubmed_search: format!("{}/pubmed/esearch", base),
            pubmed_fetch: format!("{}/pubmed/efetch", base),
            crossref: format!("{}/crossref", base),
        }
    }
}

/// Run configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub springer_api_key: Option<String>,
    pub core_api_key: Option<String>,
    pub scopus_api_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub ncbi_api_key: Option<String>,
    pub mailto: Option<String>,
    pub enabled_sources: Vec<Source>,
    pub fetch: FetchSettings,
    pub request_timeout: Duration,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            springer_api_key: None,
            core_api_key: None,
            scopus_api_key: None,
            semantic_scholar_api_key: None,
            ncbi_api_key: None,
            mailto: None,
            enabled_sources: Source::ALL.to_vec(),
            fetch: FetchSettings::default(),
            request_timeout: Duration::from_secs(15),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let enabled_sources = var("LITSCREEN_SOURCES")
            .map(|s| parse_source_list(&s))
            .unwrap_or(defaults.enabled_sources);

        let page_size = var("LITSCREEN_PAGE_SIZE")
            .and_then(|v| parse_or_warn::<u32>("LITSCREEN_PAGE_SIZE", &v))
            .filter(|n| *n > 0)
            .unwrap_or(defaults.fetch.page_size);
        let page_delay = var("LITSCREEN_PAGE_DELAY_SECS")
            .and_then(|v| parse_or_warn::<f64>("LITSCREEN_PAGE_DELAY_SECS", &v))
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(defaults.fetch.page_delay);
        let request_timeout = var("LITSCREEN_TIMEOUT_SECS")
            .and_then(|v| parse_or_warn::<u64>("LITSCREEN_TIMEOUT_SECS", &v))
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            springer_api_key: var("SPRINGER_API_KEY"),
            core_api_key: var("CORE_API_KEY"),
            scopus_api_key: var("SCOPUS_API_KEY"),
            semantic_scholar_api_key: var("SEMANTIC_SCHOLAR_API_KEY"),
            ncbi_api_key: var("NCBI_API_KEY"),
            mailto: var("LITSCREEN_MAILTO"),
            enabled_sources,
            fetch: FetchSettings {
                page_size,
                page_delay,
            },
            request_timeout,
            endpoints: defaults.endpoints,
        }
    }

    /// Shared HTTP client; the timeout applies per request.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(match self.mailto {
                Some(ref e) => format!("{} (mailto:{})", USER_AGENT, e),
                None => USER_AGENT.to_string(),
            })
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")
    }

    /// Build the enabled sources in run order.
    pub fn build_sources(&self) -> anyhow::Result<Vec<Arc<dyn PaperSource>>> {
        let client = self.build_client()?;
        let ep = &self.endpoints;
        let settings = &self.fetch;

        let sources = Source::ALL
            .into_iter()
            .filter(|s| self.enabled_sources.contains(s))
            .map(|source| -> Arc<dyn PaperSource> {
                let client = client.clone();
                match source {
                    Source::Springer => Arc::new(apis::springer::SpringerClient::new(
                        client,
                        &ep.springer,
                        self.springer_api_key.clone(),
                        settings.clone(),
                    )),
                    Source::Core => Arc::new(apis::core_ac::CoreClient::new(
                        client,
                        &ep.core,
                        self.core_api_key.clone(),
                        settings.clone(),
                    )),
                    Source::Arxiv => Arc::new(apis::arxiv::ArxivClient::new(
                        client,
                        &ep.arxiv,
                        settings.clone(),
                    )),
                    Source::SemanticScholar => {
                        Arc::new(apis::semantic_scholar::SemanticScholarClient::new(
                            client,
                            &ep.semantic_scholar,
                            self.semantic_scholar_api_key.clone(),
                            settings.clone(),
                        ))
                    }
                    Source::Scopus => Arc::new(apis::scopus::ScopusClient::new(
                        client,
                        &ep.scopus,
                        self.scopus_api_key.clone(),
                        settings.clone(),
                    )),
                    Source::OpenAlex => Arc::new(apis::openalex::OpenAlexClient::new(
                        client,
                        &ep.openalex,
                        self.mailto.clone(),
                        settings.clone(),
                    )),
                    Source::PubMed => Arc::new(apis::pubmed::PubMedClient::new(
                        client,
                        &ep.pubmed_search,
                        &ep.pubmed_fetch,
                        self.ncbi_api_key.clone(),
                        settings.clone(),
                    )),
                    Source::Crossref => Arc::new(apis::crossref::CrossRefClient::new(
                        client,
                        &ep.crossref,
                        self.mailto.clone(),
                        settings.clone(),
                    )),
                }
            })
            .collect();

        Ok(sources)
    }

    /// Return a status line per provider.
    pub fn source_status(&self) -> Vec<SourceStatus> {
        let key_note = |key: &Option<String>, var: &str| match key {
            Some(_) => "API key set".to_string(),
            None => format!("{} not set, requests will fail", var),
        };
        let optional_note = |key: &Option<String>| match key {
            Some(_) => "API key set".to_string(),
            None => "No API key (shared rate limit)".to_string(),
        };
        let polite_note = match self.mailto {
            Some(_) => "Polite pool email set".to_string(),
            None => "No email (anonymous pool)".to_string(),
        };

        Source::ALL
            .into_iter()
            .map(|source| {
                let note = match source {
                    Source::Springer => key_note(&self.springer_api_key, "SPRINGER_API_KEY"),
                    Source::Core => key_note(&self.core_api_key, "CORE_API_KEY"),
                    Source::Scopus => key_note(&self.scopus_api_key, "SCOPUS_API_KEY"),
                    Source::SemanticScholar => optional_note(&self.semantic_scholar_api_key),
                    Source::PubMed => optional_note(&self.ncbi_api_key),
                    Source::OpenAlex | Source::Crossref => polite_note.clone(),
                    Source::Arxiv => "No API key required".to_string(),
                };
                let enabled = self.enabled_sources.contains(&source);
                SourceStatus {
                    source,
                    enabled,
                    note: if enabled {
                        note
                    } else {
                        "Disabled by LITSCREEN_SOURCES filter".to_string()
                    },
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub source: Source,
    pub enabled: bool,
    pub note: String,
}

/// Parse a comma-separated source list, keeping run order and dropping
/// unknown names with a warning.
pub fn parse_source_list(list: &str) -> Vec<Source> {
    let mut wanted = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match name.parse::<Source>() {
            Ok(source) => wanted.push(source),
            Err(e) => tracing::warn!("Ignoring source filter entry: {}", e),
        }
    }
    Source::ALL
        .into_iter()
        .filter(|s| wanted.contains(s))
        .collect()
}

fn parse_or_warn<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={}", name, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.enabled_sources, Source::ALL.to_vec());
        assert_eq!(config.fetch.page_size, 10);
        assert_eq!(config.fetch.page_delay, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.springer_api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("SPRINGER_API_KEY", " abc "),
            ("CORE_API_KEY", ""),
            ("LITSCREEN_PAGE_SIZE", "25"),
            ("LITSCREEN_PAGE_DELAY_SECS", "0.5"),
            ("LITSCREEN_TIMEOUT_SECS", "nope"),
        ]);
        assert_eq!(config.springer_api_key.as_deref(), Some("abc"));
        assert!(config.core_api_key.is_none());
        assert_eq!(config.fetch.page_size, 25);
        assert_eq!(config.fetch.page_delay, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_source_filter_keeps_run_order() {
        let sources = parse_source_list("crossref, arxiv,unknown,Springer");
        assert_eq!(sources, vec![Source::Springer, Source::Arxiv, Source::Crossref]);
    }

    #[test]
    fn test_build_sources_respects_filter() {
        let config = config_from(&[("LITSCREEN_SOURCES", "pubmed,openalex")]);
        let sources = config.build_sources().unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["OpenAlex", "PubMed"]);
    }

    #[test]
    fn test_source_status_notes() {
        let config = config_from(&[("LITSCREEN_SOURCES", "arxiv,scopus")]);
        let statuses = config.source_status();
        assert_eq!(statuses.len(), 8);
        let scopus = statuses.iter().find(|s| s.source == Source::Scopus).unwrap();
        assert!(scopus.enabled);
        assert!(scopus.note.contains("SCOPUS_API_KEY"));
        let core = statuses.iter().find(|s| s.source == Source::Core).unwrap();
        assert!(!core.enabled);
    }

    #[test]
    fn test_rooted_endpoints() {
        let ep = Endpoints::rooted_at("http://127.0.0.1:9000/");
        assert_eq!(ep.springer, "http://127.0.0.1:9000/springer");
        assert_eq!(ep.pubmed_fetch, "http://127.0.0.1:9000/pubmed/efetch");
    }
}
