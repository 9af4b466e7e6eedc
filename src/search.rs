use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::apis::PaperSource;
use crate::record::{Record, Source};
use crate::sink::RecordSink;

/// What a single provider contributed to a run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub appended: usize,
    /// Failure message when the provider stopped early.
    pub error: Option<String>,
}

/// Outcome of a full collection run.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub records: Vec<Record>,
    pub reports: Vec<SourceReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Harvest {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }
}

/// Run every source once, in order, against one shared quota.
///
/// The query is percent-encoded here, once, before any source sees it. A
/// source that fails is logged and recorded in its report; later sources
/// still run. Sources that start after the quota is met return immediately.
pub async fn collect(sources: &[Arc<dyn PaperSource>], query: &str, target: usize) -> Harvest {
    let encoded = urlencoding::encode(query);
    let mut sink = RecordSink::new(target);
    let mut reports = Vec::with_capacity(sources.len());
    let started_at = Utc::now();

    tracing::info!(query, target, sources = sources.len(), "Starting collection run");

    for source in sources {
        tracing::info!("Fetching from {}...", source.name());
        let before = sink.len();
        let result = source.fetch(&encoded, &mut sink).await;
        let appended = sink.len() - before;

        let error = match result {
            Ok(()) => {
                tracing::info!(
                    source = source.name(),
                    appended,
                    remaining = sink.papers_left(),
                    "Source finished"
                );
                None
            }
            Err(e) => {
                tracing::warn!("{} error: {} ({} records kept)", source.name(), e, appended);
                Some(e.to_string())
            }
        };
        reports.push(SourceReport {
            source: source.source(),
            appended,
            error,
        });
    }

    let finished_at = Utc::now();
    let harvest = Harvest {
        records: sink.into_records(),
        reports,
        started_at,
        finished_at,
    };
    tracing::info!(
        total = harvest.total(),
        elapsed_ms = harvest.elapsed().num_milliseconds(),
        "Collection run complete"
    );
    harvest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Appends `per_call` records, then optionally fails.
    struct FakeSource {
        source: Source,
        per_call: usize,
        fail: bool,
        calls: AtomicUsize,
        seen_query: std::sync::Mutex<String>,
    }

    impl FakeSource {
        fn new(source: Source, per_call: usize, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                source,
                per_call,
                fail,
                calls: AtomicUsize::new(0),
                seen_query: std::sync::Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl PaperSource for FakeSource {
        fn source(&self) -> Source {
            self.source
        }

        async fn fetch(&self, query: &str, sink: &mut RecordSink) -> Result<(), SourceError> {
            if sink.is_full() {
                return Ok(());
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_query.lock().unwrap() = query.to_string();
            sink.extend_until_full((0..self.per_call).map(|_| Record::empty(self.source)));
            if self.fail {
                return Err(SourceError::Api("simulated outage".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_collect_stops_at_target_and_keeps_order() {
        let a = FakeSource::new(Source::Springer, 3, false);
        let b = FakeSource::new(Source::Core, 10, false);
        let c = FakeSource::new(Source::Arxiv, 10, false);
        let sources: Vec<Arc<dyn PaperSource>> = vec![a.clone(), b.clone(), c.clone()];

        let harvest = collect(&sources, "\"graph neural\" AND review", 8).await;

        assert_eq!(harvest.total(), 8);
        assert_eq!(harvest.records[..3].iter().filter(|r| r.source == Source::Springer).count(), 3);
        assert!(harvest.records[3..].iter().all(|r| r.source == Source::Core));
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
        assert_eq!(harvest.reports.len(), 3);
        assert_eq!(harvest.reports[2].appended, 0);
        assert_eq!(
            *a.seen_query.lock().unwrap(),
            "%22graph%20neural%22%20AND%20review"
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let a = FakeSource::new(Source::Springer, 2, true);
        let b = FakeSource::new(Source::Core, 4, false);
        let sources: Vec<Arc<dyn PaperSource>> = vec![a, b];

        let harvest = collect(&sources, "q", 20).await;

        assert_eq!(harvest.total(), 6);
        assert_eq!(harvest.reports[0].appended, 2);
        assert!(harvest.reports[0].error.as_deref().unwrap().contains("simulated outage"));
        assert!(harvest.reports[1].error.is_none());
        assert_eq!(harvest.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty_harvest() {
        let harvest = collect(&[], "q", 5).await;
        assert_eq!(harvest.total(), 0);
        assert!(harvest.reports.is_empty());
        assert!(harvest.elapsed() >= chrono::Duration::zero());
    }
}
