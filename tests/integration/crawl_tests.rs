//! Integration tests for the crawler
//!
//! Most tests run the engine against an in-memory site so the link graph is
//! exact. The last ones use wiremock to create mock HTTP servers and test
//! the full fetch-store-extract cycle end-to-end.

use async_trait::async_trait;
use scope_crawler::config::{Config, CrawlerConfig, HttpConfig};
use scope_crawler::crawler::{
    crawl, CrawlEngine, CrawlOutcome, ExtractError, FetchError, HtmlLinkExtractor, HttpFetcher,
    LinkExtractor, PageFetcher,
};
use scope_crawler::{CrawlError, CrawlScope};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory site: URL -> HTML body; anything else is a 404
struct MockSite {
    pages: HashMap<String, String>,
    fetches: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl MockSite {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            fetches: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fetch_counts(&self) -> HashMap<String, usize> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockSite {
    async fn fetch(&self, url: &Url, _destination: &Path) -> Result<String, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Page whose body links to every given href
fn page(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

fn engine(seed: &str, site: Arc<MockSite>, workers: usize) -> (Url, CrawlEngine) {
    let (seed, scope) = CrawlScope::parse(seed).expect("valid seed");
    let engine = CrawlEngine::new(
        scope,
        "unused",
        site,
        Arc::new(HtmlLinkExtractor::default()),
    )
    .with_workers(workers);
    (seed, engine)
}

fn as_set(urls: &[String]) -> HashSet<&str> {
    urls.iter().map(String::as_str).collect()
}

#[tokio::test]
async fn test_seed_with_single_child() {
    let site = Arc::new(MockSite::new(&[
        (
            "https://example.com/a",
            &page(&["https://example.com/a/link1", "https://example.com/b"]),
        ),
        ("https://example.com/a/link1", &page(&[])),
    ]));

    let (seed, engine) = engine("https://example.com/a", site.clone(), 4);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    let urls = results.collect().await;
    let report = handle.join().await;

    assert_eq!(urls.len(), 2, "each URL published once: {:?}", urls);
    assert_eq!(
        as_set(&urls),
        HashSet::from(["https://example.com/a", "https://example.com/a/link1"])
    );
    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert!(!site.fetch_counts().contains_key("https://example.com/b"));
}

#[tokio::test]
async fn test_seed_without_links_publishes_once() {
    let site = Arc::new(MockSite::new(&[("https://example.com/", &page(&[]))]));

    let (seed, engine) = engine("https://example.com/", site, 2);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    assert_eq!(results.collect().await, vec!["https://example.com/"]);
    let report = handle.join().await;
    assert_eq!(report.summary.stats.published, 1);
    assert_eq!(report.summary.stats.links_found, 0);
}

#[tokio::test]
async fn test_cyclic_links_fetched_once() {
    // Every page links to every other page, itself included.
    let all = [
        "https://example.com/site/",
        "https://example.com/site/one",
        "https://example.com/site/two",
        "https://example.com/site/three",
    ];
    let body = page(&["/site/", "one", "two", "three#frag", "/site/two", ""]);
    let pages: Vec<(&str, &str)> = all.iter().map(|url| (*url, body.as_str())).collect();
    let site = Arc::new(MockSite::new(&pages));

    let (seed, engine) = engine("https://example.com/site/", site.clone(), 8);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    let urls = results.collect().await;
    let report = handle.join().await;

    assert_eq!(urls.len(), all.len());
    assert_eq!(as_set(&urls), HashSet::from(all));
    for (url, count) in site.fetch_counts() {
        assert_eq!(count, 1, "{} fetched {} times", url, count);
    }
    assert_eq!(report.summary.stats.claimed, all.len() as u64);
}

#[tokio::test]
async fn test_fetch_failure_does_not_affect_siblings() {
    let site = Arc::new(MockSite::new(&[
        (
            "https://example.com/docs",
            &page(&["/docs/ok", "/docs/missing", "/docs/also-ok"]),
        ),
        ("https://example.com/docs/ok", &page(&[])),
        ("https://example.com/docs/also-ok", &page(&[])),
    ]));

    let (seed, engine) = engine("https://example.com/docs", site.clone(), 3);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    let urls = results.collect().await;
    let report = handle.join().await;

    assert_eq!(
        as_set(&urls),
        HashSet::from([
            "https://example.com/docs",
            "https://example.com/docs/ok",
            "https://example.com/docs/also-ok",
        ])
    );
    assert_eq!(report.summary.stats.fetch_failures, 1);
    assert_eq!(site.fetch_counts().get("https://example.com/docs/missing"), Some(&1));
}

#[tokio::test]
async fn test_failing_seed_ends_crawl_with_no_results() {
    let site = Arc::new(MockSite::new(&[]));

    let (seed, engine) = engine("https://example.com/gone", site, 2);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    assert!(results.collect().await.is_empty());
    let report = handle.join().await;
    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.summary.stats.fetch_failures, 1);
}

#[tokio::test]
async fn test_single_worker_crawls_whole_site() {
    let site = Arc::new(MockSite::new(&[
        ("https://example.com/", &page(&["/x", "/y"])),
        ("https://example.com/x", &page(&["/y", "/z"])),
        ("https://example.com/y", &page(&["/z"])),
        ("https://example.com/z", &page(&["/"])),
    ]));

    let (seed, engine) = engine("https://example.com/", site, 1);
    let (handle, results) = engine.start(seed).expect("crawl starts");

    let urls = results.collect().await;
    handle.join().await;
    assert_eq!(urls.len(), 4);
}

/// Extractor that rejects every document
struct BrokenExtractor;

impl LinkExtractor for BrokenExtractor {
    fn extract_links(&self, _html: &str) -> Result<Vec<String>, ExtractError> {
        Err(ExtractError::Selector("unsupported document".to_string()))
    }
}

#[tokio::test]
async fn test_extraction_failure_publishes_nothing() {
    let site = Arc::new(MockSite::new(&[(
        "https://example.com/",
        &page(&["/never-followed"]),
    )]));
    let (seed, scope) = CrawlScope::parse("https://example.com/").expect("valid seed");
    let engine = CrawlEngine::new(scope, "unused", site.clone(), Arc::new(BrokenExtractor));

    let (handle, results) = engine.start(seed).expect("crawl starts");

    assert!(results.collect().await.is_empty());
    let report = handle.join().await;
    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.summary.stats.extract_failures, 1);
    assert_eq!(report.summary.stats.published, 0);
    assert_eq!(site.fetch_counts().len(), 1);
}

/// A site that never ends: every page links to two further pages
fn endless_site() -> Vec<(String, String)> {
    let mut pages = vec![("https://example.com/p/".to_string(), page(&["0", "1"]))];
    pages.extend((0..500).map(|i| {
        (
            format!("https://example.com/p/{}", i),
            page(&[&format!("/p/{}", i + 1), &format!("/p/{}", i + 2)]),
        )
    }));
    pages
}

#[tokio::test]
async fn test_cancel_closes_stream_and_drains() {
    let pages = endless_site();
    let pages: Vec<(&str, &str)> = pages.iter().map(|(u, b)| (u.as_str(), b.as_str())).collect();
    let site = Arc::new(MockSite::new(&pages).with_delay(Duration::from_millis(30)));

    let (seed, engine) = engine("https://example.com/p/", site, 2);
    let engine = engine.with_shutdown_grace(Duration::from_secs(2));
    let (handle, mut results) = engine.start(seed).expect("crawl starts");

    assert!(results.recv().await.is_some());
    handle.cancel();
    assert!(handle.is_cancelled());

    // Already-queued URLs may still be buffered; the stream must end soon.
    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        while results.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "result stream did not close");

    let report = handle.shutdown().await;
    assert!(matches!(
        report.outcome,
        CrawlOutcome::Cancelled { drained: true, .. }
    ));
    assert!(report.summary.stats.claimed < 500);
}

#[tokio::test]
async fn test_shutdown_grace_elapses_on_stuck_fetch() {
    let site = Arc::new(
        MockSite::new(&[("https://example.com/", &page(&[]))]).with_delay(Duration::from_secs(30)),
    );

    let (seed, engine) = engine("https://example.com/", site, 1);
    let engine = engine.with_shutdown_grace(Duration::from_millis(50));
    let (handle, results) = engine.start(seed).expect("crawl starts");

    // Give the worker time to pick up the seed.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let report = tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("shutdown is bounded by the grace period");

    assert!(matches!(
        report.outcome,
        CrawlOutcome::Cancelled { drained: false, .. }
    ));
    assert!(results.collect().await.is_empty());
}

#[tokio::test]
async fn test_independent_crawls_share_nothing() {
    let site = Arc::new(MockSite::new(&[
        ("https://example.com/", &page(&["/a"])),
        ("https://example.com/a", &page(&[])),
    ]));

    let (seed_1, engine_1) = engine("https://example.com/", site.clone(), 2);
    let (seed_2, engine_2) = engine("https://example.com/", site.clone(), 2);
    let (handle_1, results_1) = engine_1.start(seed_1).expect("crawl starts");
    let (handle_2, results_2) = engine_2.start(seed_2).expect("crawl starts");

    let (urls_1, urls_2) = tokio::join!(results_1.collect(), results_2.collect());
    handle_1.join().await;
    handle_2.join().await;

    assert_eq!(urls_1.len(), 2);
    assert_eq!(urls_2.len(), 2);
    assert_eq!(site.fetch_counts().get("https://example.com/a"), Some(&2));
}

fn test_config(workers: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            ..CrawlerConfig::default()
        },
        http: HttpConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: Some("https://example.com/contact".to_string()),
            ..HttpConfig::default()
        },
    }
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let host = Url::parse(&base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();
    let port = Url::parse(&base_url).unwrap().port().expect("mock server port");

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r##"<html><head><title>Docs</title></head><body>
                    <a href="a">A</a>
                    <a href="/docs/b/">B</a>
                    <a href="/other">Outside the prefix</a>
                    <a href="https://elsewhere.example/docs/x">Other host</a>
                    <a href="{}/docs/a#intro">A again</a>
                    <a href="#top">Top</a>
                    </body></html>"##,
                    base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body><a href="/docs">Back</a><a href="/docs/b/#s">B</a></body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/b/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body>Leaf</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let (urls, report) = crawl(
        &test_config(4),
        &format!("{}/docs", base_url),
        destination.path(),
    )
    .await
    .expect("Crawl failed");

    let expected: HashSet<String> = ["/docs", "/docs/a", "/docs/b/"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    assert_eq!(urls.len(), 3, "each URL published once: {:?}", urls);
    assert_eq!(urls.into_iter().collect::<HashSet<_>>(), expected);
    assert_eq!(report.outcome, CrawlOutcome::Completed);

    let site_dir = destination.path().join(format!("{}:{}", host, port));
    let docs = std::fs::read_to_string(site_dir.join("docs.html")).expect("docs page stored");
    assert!(docs.contains("<title>Docs</title>"));
    assert!(site_dir.join("docs/a.html").is_file());
    assert_eq!(
        std::fs::read_to_string(site_dir.join("docs/b/index.html")).expect("leaf page stored"),
        "<html><body>Leaf</body></html>"
    );
}

#[tokio::test]
async fn test_http_error_status_is_not_published() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/missing">Gone</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let (urls, report) = crawl(&test_config(2), &format!("{}/", base_url), destination.path())
        .await
        .expect("Crawl failed");

    assert_eq!(urls, vec![format!("{}/", base_url)]);
    assert_eq!(report.summary.stats.fetch_failures, 1);
}

#[tokio::test]
async fn test_invalid_seed_rejected() {
    let destination = tempfile::tempdir().expect("Failed to create temp dir");

    assert!(crawl(&Config::default(), "not a url", destination.path())
        .await
        .is_err());
    assert!(crawl(&Config::default(), "ftp://example.com/", destination.path())
        .await
        .is_err());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(2);
    config.crawler.workers = 0;

    let result = crawl(&config, "https://example.com/", destination.path()).await;
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[tokio::test]
async fn test_page_bytes_stored_unchanged() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let server = Url::parse(&base_url).expect("Failed to parse base URL");
    let site_dir = format!(
        "{}:{}",
        server.host_str().expect("mock server host"),
        server.port().expect("mock server port")
    );

    // Latin-1 text and a NUL byte: not valid UTF-8.
    let mut body = br#"<html><body><a href="/next">caf"#.to_vec();
    body.extend_from_slice(&[0xe9, 0xff, 0xfe, 0x00]);
    body.extend_from_slice(b"</a></body></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.clone())
                .insert_header("content-type", "text/html; charset=iso-8859-1"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x80, 0x81]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let (urls, _) = crawl(&test_config(2), &format!("{}/", base_url), destination.path())
        .await
        .expect("Crawl failed");

    assert_eq!(urls.len(), 2, "link found in a non-UTF-8 page: {:?}", urls);

    let site_dir = destination.path().join(site_dir);
    assert_eq!(std::fs::read(site_dir.join("index.html")).unwrap(), body);
    assert_eq!(std::fs::read(site_dir.join("next.html")).unwrap(), vec![0x80, 0x81]);
}

#[tokio::test]
async fn test_oversized_body_rejected_before_storing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&HttpConfig::default())
        .expect("client builds")
        .with_max_body_bytes(16);
    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let url = Url::parse(&format!("{}/big", base_url)).unwrap();

    let result = fetcher.fetch(&url, destination.path()).await;

    assert!(matches!(result, Err(FetchError::TooLarge { limit: 16, .. })));
    assert!(std::fs::read_dir(destination.path()).unwrap().next().is_none());
}
