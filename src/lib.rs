//! # litscreen
//!
//! Collects bibliographic records for one query from several scholarly APIs
//! (Springer, CORE, arXiv, Semantic Scholar, Scopus, OpenAlex, PubMed,
//! Crossref), normalizes them into six text columns, and stops once a target
//! record count is reached.
//!
//! - [`apis`] - one `PaperSource` adapter per provider
//! - [`sink`] - append-only record buffer that doubles as the quota
//! - [`search`] - runs the sources in order and reports per-source results
//! - [`export`] - CSV export
//! - [`config`] - environment configuration and source assembly
//!
//! ```rust,no_run
//! use litscreen::{config::Config, export, search};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let sources = config.build_sources()?;
//!     let harvest = search::collect(&sources, "\"systematic review\" AND screening", 20).await;
//!     export::export_csv("literature_screening.csv".as_ref(), &harvest.records)?;
//!     Ok(())
//! }
//! ```

pub mod apis;
pub mod config;
pub mod export;
pub mod record;
pub mod search;
pub mod sink;

pub use record::{Record, Source, NOT_AVAILABLE};
pub use sink::RecordSink;
