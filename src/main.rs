use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use litscreen::config::{parse_source_list, Config};
use litscreen::{export, search};

/// Collect literature-screening records from several scholarly APIs into one CSV.
#[derive(Debug, Parser)]
#[command(name = "litscreen", version, about)]
struct Cli {
    /// Search expression (boolean operators and quoted phrases allowed)
    #[arg(required_unless_present = "list_sources")]
    query: Option<String>,

    /// Total number of records to collect across all sources
    #[arg(short = 'n', long, default_value_t = 20)]
    target: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "literature_screening.csv")]
    output: PathBuf,

    /// Comma-separated sources to query (overrides LITSCREEN_SOURCES)
    #[arg(long)]
    sources: Option<String>,

    /// Seconds to wait between pages of a paginated source
    #[arg(long)]
    delay_secs: Option<f64>,

    /// Print provider configuration and exit
    #[arg(long)]
    list_sources: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(ref list) = cli.sources {
        config.enabled_sources = parse_source_list(list);
    }
    if let Some(secs) = cli.delay_secs {
        match Duration::try_from_secs_f64(secs) {
            Ok(delay) => config.fetch.page_delay = delay,
            Err(_) => tracing::warn!("Ignoring invalid --delay-secs {}", secs),
        }
    }

    if cli.list_sources {
        for status in config.source_status() {
            let state = if status.enabled { "enabled " } else { "disabled" };
            println!("{:<18} {} {}", status.source.label(), state, status.note);
        }
        return Ok(());
    }

    let query = cli.query.unwrap_or_default();
    let sources = config.build_sources()?;
    let harvest = search::collect(&sources, &query, cli.target).await;

    export::export_csv(&cli.output, &harvest.records)?;

    for report in &harvest.reports {
        let label = report.source.label();
        match report.error {
            Some(ref e) => println!(
                "  {:<18} {:>4} records (stopped: {})",
                label, report.appended, e
            ),
            None => println!("  {:<18} {:>4} records", label, report.appended),
        }
    }
    println!("Saved to '{}'", cli.output.display());
    println!("Total papers fetched: {}", harvest.total());
    println!("Runtime: {}", format_elapsed(harvest.elapsed()));

    Ok(())
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    let secs = millis / 1000;
    format!("{}:{:02}:{:02}.{:03}", secs / 3600, (secs / 60) % 60, secs % 60, millis % 1000)
}
