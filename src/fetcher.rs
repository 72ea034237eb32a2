use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{Result, ScrapeError};
use crate::parser::record::Record;
use crate::parser::{self, Pending, PageKind};

/// Outcome of one item in a batch run.
pub struct ItemResult {
    pub url: String,
    pub record: Result<Record>,
}

/// Batch stats returned after completion.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// What a single `scrape` request found behind a URL.
#[derive(Debug)]
pub enum Scraped {
    /// Listing page: result URL and title pairs, in page order.
    Listing(Vec<(String, String)>),
    Item(Record),
    /// Neither an item nor a search page.
    Unrecognized,
}

/// HTTP side of the pipeline: fetches pages and item JSON with retries.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
        })
    }

    /// GET `url` as text, backing off on 429 and transient 5xx responses.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.base_backoff * 2u32.pow(attempt);
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt + 1,
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Fetch a page and classify it.
    pub async fn detect(&self, url: &Url) -> Result<Option<PageKind>> {
        let html = self.get_text(url.as_str()).await?;
        Ok(parser::classify_page(&Html::parse_document(&html), url))
    }

    /// Fetch a listing page and return its result URLs and titles.
    pub async fn search(&self, url: &Url) -> Result<Vec<(String, String)>> {
        let html = self.get_text(url.as_str()).await?;
        let results = parser::search::search_results(&Html::parse_document(&html), url);
        Ok(results.map(|r| r.into_iter().collect()).unwrap_or_default())
    }

    /// Fetch `url` once, classify it, and either list its results or build
    /// the item record from the same response.
    pub async fn scrape(&self, url: &Url) -> Result<Scraped> {
        let html = self.get_text(url.as_str()).await?;
        // the parsed document is not Send; keep it out of the awaits below
        let kind = parser::classify_page(&Html::parse_document(&html), url);
        match kind {
            None => Ok(Scraped::Unrecognized),
            Some(PageKind::Multiple) => {
                let results = parser::search::search_results(&Html::parse_document(&html), url);
                Ok(Scraped::Listing(results.map(|r| r.into_iter().collect()).unwrap_or_default()))
            }
            Some(PageKind::Item(_)) => {
                let pending = parser::begin_record(&html, url);
                self.complete(pending).await.map(Scraped::Item)
            }
        }
    }

    /// Build the record for one item page. Modern pages need a second
    /// request to the item API; failure there fails the item.
    pub async fn scrape_item(&self, url: &Url) -> Result<Record> {
        let html = self.get_text(url.as_str()).await?;
        let pending = parser::begin_record(&html, url);
        self.complete(pending).await
    }

    async fn complete(&self, pending: Pending) -> Result<Record> {
        match pending {
            Pending::Complete(record) => Ok(record),
            Pending::NeedsItemJson { record, api_url } => {
                debug!("Fetching item JSON: {}", api_url);
                let json = self.get_text(&api_url).await?;
                parser::finish_record(record, &json)
            }
        }
    }
}

/// Scrape item pages concurrently, handing each result to `on_item` as it
/// arrives. A failed item never stops its siblings.
pub async fn scrape_items_streaming(
    fetcher: &Fetcher,
    urls: Vec<Url>,
    concurrency: usize,
    mut on_item: impl FnMut(ItemResult),
) -> anyhow::Result<ScrapeStats> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<ItemResult>(concurrency.max(1) * 2);

    for url in urls {
        let fetcher = fetcher.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let record = match sem.acquire_owned().await {
                Ok(_permit) => fetcher.scrape_item(&url).await,
                Err(e) => Err(ScrapeError::NotAnItem(format!("scheduler closed: {}", e))),
            };
            let _ = tx
                .send(ItemResult {
                    url: url.to_string(),
                    record,
                })
                .await;
        });
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(item) = rx.recv().await {
        match &item.record {
            Ok(_) => ok += 1,
            Err(e) => {
                warn!("Item failed for {}: {}", item.url, e);
                errors += 1;
            }
        }
        on_item(item);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Scraped {} items ({} ok, {} errors)", total, ok, errors);

    Ok(ScrapeStats { total, ok, errors })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    // direct connections only, so a proxy in the environment cannot answer for 127.0.0.1
    fn local_fetcher() -> Fetcher {
        Fetcher {
            client: reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            max_retries: 0,
            base_backoff: Duration::from_millis(1),
        }
    }

    /// Minimal HTTP/1.1 server answering fixed bodies by path; unknown paths
    /// get a 404. Returns the base URL and a request counter.
    async fn serve(routes: Vec<(&'static str, String)>) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let routes = Arc::new(routes);
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    counter.fetch_add(1, Ordering::SeqCst);

                    let (status, body) = match routes.iter().find(|(p, _)| *p == path) {
                        Some((_, body)) => ("200 OK", body.clone()),
                        None => ("404 Not Found", String::new()),
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (base, hits)
    }

    #[tokio::test]
    async fn scrape_fetches_an_item_page_once() {
        let (base, hits) = serve(vec![("/cdm/ref/collection/hart/id/7", fixture("legacy_item.html"))]).await;
        let fetcher = local_fetcher();
        let url = base.join("/cdm/ref/collection/hart/id/7").unwrap();

        let Scraped::Item(record) = fetcher.scrape(&url).await.unwrap() else {
            panic!("legacy page should scrape as an item");
        };
        assert_eq!(record.archive, "Hart Collection");
        assert_eq!(record.creators[0].last_name, "Hart");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scrape_lists_search_results_from_one_request() {
        let (base, hits) = serve(vec![(
            "/digital/search/searchterm/cookbook",
            fixture("search_results.html"),
        )])
        .await;
        let fetcher = local_fetcher();
        let url = base.join("/digital/search/searchterm/cookbook").unwrap();

        let Scraped::Listing(results) = fetcher.scrape(&url).await.unwrap() else {
            panic!("search page should scrape as a listing");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, base.join("/digital/collection/cook/id/12").unwrap().as_str());
        assert_eq!(results[0].1, "The Household Cookbook");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scrape_reports_unrecognized_and_http_errors() {
        let (base, _) = serve(vec![("/about", "<html><body>About</body></html>".to_string())]).await;
        let fetcher = local_fetcher();

        let scraped = fetcher.scrape(&base.join("/about").unwrap()).await.unwrap();
        assert!(matches!(scraped, Scraped::Unrecognized));

        let err = fetcher.scrape(&base.join("/missing").unwrap()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn batch_continues_past_a_failed_item() {
        let (base, _) = serve(vec![("/cdm/ref/collection/hart/id/7", fixture("legacy_item.html"))]).await;
        let fetcher = local_fetcher();
        let urls = vec![
            Url::parse("http://127.0.0.1:1/cdm/ref/collection/hart/id/8").unwrap(),
            base.join("/cdm/ref/collection/hart/id/7").unwrap(),
        ];

        let mut seen = Vec::new();
        let stats = scrape_items_streaming(&fetcher, urls, 2, |item| {
            seen.push((item.url, item.record.is_ok()));
        })
        .await
        .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.ok, 1);
        assert_eq!(stats.errors, 1);
        seen.sort();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().any(|(url, ok)| url.starts_with("http://127.0.0.1:1/") && !ok));
        assert!(seen.iter().any(|(url, ok)| url.starts_with(base.as_str()) && *ok));
    }
}
