mod config;
mod error;
mod fetcher;
mod parser;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use url::Url;

use config::Settings;
use fetcher::{Fetcher, ItemResult, Scraped};
use parser::record::Record;

#[derive(Parser)]
#[command(name = "cdm_scraper", about = "Citation metadata from CONTENTdm collections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a page: multiple, document, artwork or interview
    Detect { url: Url },
    /// List the results on a search page
    Search { url: Url },
    /// Extract records from an item page, or from every result of a search page
    Scrape {
        url: Url,
        /// Max results to scrape from a search page (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Concurrent item fetches (default: CDM_CONCURRENCY or 10)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Extract records from saved item pages without network access
    Extract {
        /// Page URL the files were saved from
        #[arg(long)]
        url: Url,
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("invalid CDM_* settings")?;

    match cli.command {
        Commands::Detect { url } => {
            let fetcher = Fetcher::new(&settings)?;
            match fetcher.detect(&url).await? {
                Some(kind) => println!("{}", kind),
                None => println!("Not a CONTENTdm item or search page."),
            }
        }
        Commands::Search { url } => {
            let fetcher = Fetcher::new(&settings)?;
            let results = fetcher.search(&url).await?;
            if results.is_empty() {
                println!("No results found.");
            }
            for (i, (href, title)) in results.iter().enumerate() {
                println!("{:>3} | {} | {}", i + 1, truncate(title, 60), href);
            }
        }
        Commands::Scrape { url, limit, concurrency } => {
            let fetcher = Fetcher::new(&settings)?;
            match fetcher.scrape(&url).await? {
                Scraped::Listing(results) => {
                    let mut urls = results
                        .into_iter()
                        .filter_map(|(href, _)| Url::parse(&href).ok())
                        .collect::<Vec<_>>();
                    if let Some(n) = limit {
                        urls.truncate(n);
                    }
                    eprintln!("Scraping {} items...", urls.len());
                    let mut sink = RecordSink::new(std::io::stdout().lock());
                    let stats = fetcher::scrape_items_streaming(
                        &fetcher,
                        urls,
                        concurrency.unwrap_or(settings.concurrency),
                        |item: ItemResult| {
                            if let Ok(record) = &item.record {
                                sink.push(record);
                            }
                        },
                    )
                    .await?;
                    sink.finish()?;
                    eprintln!(
                        "Done: {} scraped ({} ok, {} errors).",
                        stats.total, stats.ok, stats.errors
                    );
                }
                Scraped::Item(record) => print_record(&record)?,
                Scraped::Unrecognized => {
                    anyhow::bail!("{} is not a CONTENTdm item or search page", url)
                }
            }
        }
        Commands::Extract { url, files } => {
            let (records, failures) = extract_files(&url, &files);
            for record in &records {
                print_record(record)?;
            }
            for (path, e) in &failures {
                tracing::warn!("Skipped {}: {:#}", path.display(), e);
            }
            eprintln!("Extracted {} records ({} failed).", records.len(), failures.len());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

/// Parse saved pages in parallel; each file is independent.
fn extract_files(url: &Url, files: &[PathBuf]) -> (Vec<Record>, Vec<(PathBuf, anyhow::Error)>) {
    use rayon::prelude::*;

    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            let record = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))
                .and_then(|html| Ok(parser::extract_offline(&html, url)?));
            (path.clone(), record)
        })
        .collect();

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (path, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => failures.push((path, e)),
        }
    }
    (records, failures)
}

fn print_record(record: &Record) -> anyhow::Result<()> {
    write_record(&mut std::io::stdout().lock(), record)
}

fn write_record(out: &mut impl Write, record: &Record) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

/// JSON-lines writer for streamed records. Stops writing at the first
/// failure and reports it from `finish`, once the batch is done.
struct RecordSink<W: Write> {
    out: W,
    written: usize,
    error: Option<anyhow::Error>,
}

impl<W: Write> RecordSink<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            error: None,
        }
    }

    fn push(&mut self, record: &Record) {
        if self.error.is_some() {
            return;
        }
        match write_record(&mut self.out, record) {
            Ok(()) => self.written += 1,
            Err(e) => self.error = Some(e.context(format!("writing record for {}", record.url))),
        }
    }

    fn finish(self) -> anyhow::Result<usize> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.written),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
