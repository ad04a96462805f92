//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full paginate → fan out → persist cycle end-to-end.

use catalog_harvester::config::{Config, CrawlerConfig, OutputConfig};
use catalog_harvester::crawler::{run_crawl, Coordinator, FetchError, ListingError, PageClient};
use catalog_harvester::storage::{
    JsonArrayStore, PersistError, PersistResult, Persister, CSV_HEADERS,
};
use catalog_harvester::{CrawlState, HarvestError, Product, Termination};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawler configuration pointed at the mock server
fn crawler_config(server: &MockServer) -> CrawlerConfig {
    CrawlerConfig {
        start_url: format!("{}/", server.uri()),
        request_timeout_ms: 300,
        ..CrawlerConfig::default()
    }
}

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        crawler: crawler_config(server),
        output: OutputConfig {
            json_path: dir.path().join("products.json").display().to_string(),
            csv_path: dir.path().join("products.csv").display().to_string(),
        },
    }
}

fn listing_html(server: &MockServer, slugs: &[&str]) -> String {
    let items: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="product"><a href="{}/product/{}/" class="woocommerce-LoopProduct-link woocommerce-loop-product__link"><h2>{}</h2></a></li>"#,
                server.uri(),
                slug,
                slug
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="products columns-4">{}</ul></body></html>"#,
        items
    )
}

fn detail_html(title: &str, sizes: &[&str]) -> String {
    let variants = if sizes.is_empty() {
        String::new()
    } else {
        let options: String = sizes
            .iter()
            .map(|s| format!(r#"<option value="{}">{}</option>"#, s, s))
            .collect();
        format!(
            r#"<table class="variations"><tbody><tr>
                <th class="label"><label for="pa_size">Size</label></th>
                <td class="value"><select id="pa_size"><option value="">Choose an option</option>{}</select></td>
            </tr></tbody></table>"#,
            options
        )
    };

    format!(
        r#"<html><body>
        <div class="woocommerce-product-gallery__image"><a href="https://cdn.example.com/{title}.jpg"><img></a></div>
        <h1 class="product_title entry-title">{title}</h1>
        <p class="price"><span class="woocommerce-Price-amount amount"><bdi>$20.00</bdi></span></p>
        <div class="woocommerce-product-details__short-description"><p>About {title}.</p></div>
        {variants}
        <div class="product_meta"><span class="sku">sku-{title}</span><span class="posted_in"><a href="/c/">Gear</a></span></div>
        <div id="tab-description"><p>Long text for {title}.</p></div>
        </body></html>"#,
        title = title,
        variants = variants
    )
}

async fn mount_listing(server: &MockServer, page: u32, slugs: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("paged", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(server, slugs)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_listing_status(server: &MockServer, page: u32, status: u16) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("paged", page.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_item(server: &MockServer, slug: &str, sizes: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/product/{}/", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(slug, sizes)))
        .expect(1)
        .mount(server)
        .await;
}

fn stored_titles(config: &Config) -> Vec<String> {
    let mut titles: Vec<String> = JsonArrayStore::new(&config.output.json_path)
        .load()
        .expect("Failed to read JSON store")
        .into_iter()
        .map(|p| p.title)
        .collect();
    titles.sort();
    titles
}

fn csv_records(config: &Config) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader =
        csv::Reader::from_path(&config.output.csv_path).expect("Failed to open CSV store");
    let headers = reader
        .headers()
        .expect("Missing CSV header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("Bad CSV row").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_two_items_persist_to_both_stores() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["alpha", "beta"]).await;
    mount_item(&server, "alpha", &[]).await;
    mount_item(&server, "beta", &["S", "M"]).await;
    mount_listing_status(&server, 2, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).expect("Failed to create coordinator");
    let stats = coordinator.run().await.expect("Crawl failed");

    assert_eq!(stats.products_persisted, 2);
    assert_eq!(stats.pages_completed, 1);
    assert_eq!(
        stats.termination,
        Some(Termination::EndOfPages {
            page: 2,
            status: 404
        })
    );
    assert_eq!(stored_titles(&config), vec!["alpha", "beta"]);

    let stored = JsonArrayStore::new(&config.output.json_path).load().unwrap();
    let beta = stored.iter().find(|p| p.title == "beta").unwrap();
    assert_eq!(beta.additional.len(), 1);
    assert_eq!(beta.additional[0].values, vec!["S", "M"]);
    assert_eq!(beta.category, "Gear");

    let (headers, rows) = csv_records(&config);
    assert_eq!(headers, CSV_HEADERS.to_vec());
    // alpha: 1 row; beta: 1 product row + 1 size row
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|r| r[7] == "Size" && r[8] == "S | M"));
}

#[tokio::test]
async fn test_end_of_pages_after_page_four() {
    let server = MockServer::start().await;
    for page in 1..=4 {
        let slug = format!("item-{}", page);
        mount_listing(&server, page, &[slug.as_str()]).await;
        mount_item(&server, &slug, &[]).await;
    }
    mount_listing_status(&server, 5, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let stats = coordinator.run().await.expect("End of pages must not be an error");

    assert_eq!(
        coordinator.state(),
        CrawlState::Terminated(Termination::EndOfPages {
            page: 5,
            status: 404
        })
    );
    assert_eq!(coordinator.state().last_completed_page(), 4);
    assert_eq!(stats.pages_completed, 4);
    assert_eq!(stats.products_persisted, 4);
    assert_eq!(stats.total_item_failures(), 0);
    assert_eq!(
        stored_titles(&config),
        vec!["item-1", "item-2", "item-3", "item-4"]
    );
}

#[tokio::test]
async fn test_terminated_step_issues_no_request_and_status_repeats() {
    let server = MockServer::start().await;
    mount_listing_status(&server, 1, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let first = coordinator.step().await.unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let second = coordinator.step().await.unwrap();
    assert_eq!(first, second);
    assert!(first.is_terminal());
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );

    // Re-fetching the terminal page directly gives the same status
    let client = PageClient::new(&config.crawler).unwrap();
    let err = client
        .fetch(&config.crawler.start_url, &[("paged", "1".to_string())])
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_item_timeout_skips_only_that_item() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["quick", "stalled", "steady"]).await;
    mount_item(&server, "quick", &[]).await;
    mount_item(&server, "steady", &[]).await;
    Mock::given(method("GET"))
        .and(path("/product/stalled/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html("stalled", &[]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    mount_listing(&server, 2, &["later"]).await;
    mount_item(&server, "later", &[]).await;
    mount_listing_status(&server, 3, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let stats = coordinator.run().await.expect("Item errors must not halt the crawl");

    assert_eq!(stats.pages_completed, 2);
    assert_eq!(stats.items_dispatched, 4);
    assert_eq!(stats.products_persisted, 3);
    assert_eq!(stats.item_failures.get("transport"), Some(&1));
    assert_eq!(stored_titles(&config), vec!["later", "quick", "steady"]);
}

#[tokio::test]
async fn test_k_items_issue_k_fetches() {
    let server = MockServer::start().await;
    let slugs = ["k1", "k2", "k3", "k4", "k5"];
    mount_listing(&server, 1, &slugs).await;
    for slug in &slugs[..4] {
        mount_item(&server, slug, &["One"]).await;
    }
    Mock::given(method("GET"))
        .and(path("/product/k5/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_status(&server, 2, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.items_dispatched, 5);
    assert_eq!(stats.products_persisted, 4);
    assert_eq!(stats.item_failures.get("status"), Some(&1));
    assert_eq!(stored_titles(&config).len(), 4);

    let (_, rows) = csv_records(&config);
    assert_eq!(rows.len(), 8);
}

#[tokio::test]
async fn test_empty_json_store_gets_single_element_array() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["solo"]).await;
    mount_item(&server, "solo", &[]).await;
    mount_listing_status(&server, 2, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    std::fs::write(&config.output.json_path, "").unwrap();

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    coordinator.run().await.unwrap();

    let raw = std::fs::read_to_string(&config.output.json_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let array = value.as_array().expect("JSON store must be an array");
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["title"], "solo");
    assert_eq!(array[0]["image"], "https://cdn.example.com/solo.jpg");
    assert_eq!(array[0]["sku"], "sku-solo");
}

#[tokio::test]
async fn test_unexpected_listing_status_halts_crawl() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["first"]).await;
    mount_item(&server, "first", &[]).await;
    mount_listing_status(&server, 2, 503).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let err = coordinator.run().await.unwrap_err();

    assert_eq!(err.last_completed_page(), Some(1));
    match &err {
        HarvestError::Halted { source, .. } => {
            assert!(matches!(
                source.as_ref(),
                HarvestError::Fetch(FetchError::Status { status: 503, .. })
            ));
        }
        other => panic!("Expected Halted, got {:?}", other),
    }
    assert_eq!(
        coordinator.state(),
        CrawlState::Terminated(Termination::Fatal { page: 2 })
    );
    assert_eq!(stored_titles(&config), vec!["first"]);
}

#[tokio::test]
async fn test_listing_timeout_halts_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let err = coordinator.run().await.unwrap_err();

    assert_eq!(err.last_completed_page(), Some(0));
    assert!(matches!(
        coordinator.state(),
        CrawlState::Terminated(Termination::Fatal { page: 1 })
    ));
}

#[tokio::test]
async fn test_custom_end_of_pages_status() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["only"]).await;
    mount_item(&server, "only", &[]).await;
    mount_listing_status(&server, 2, 410).await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.crawler.end_of_pages_status = vec![404, 410];

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let stats = coordinator.run().await.unwrap();
    assert_eq!(
        stats.termination,
        Some(Termination::EndOfPages {
            page: 2,
            status: 410
        })
    );
}

#[tokio::test]
async fn test_page_limit_stops_before_next_page() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["p1"]).await;
    mount_item(&server, "p1", &[]).await;
    mount_listing(&server, 2, &["p2"]).await;
    mount_item(&server, "p2", &[]).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("paged", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, &dir);
    config.crawler.max_pages = Some(2);

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.termination, Some(Termination::PageLimit { last_page: 2 }));
    assert_eq!(stats.products_persisted, 2);
}

#[tokio::test]
async fn test_empty_listing_page_advances() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &[]).await;
    mount_listing(&server, 2, &["after-gap"]).await;
    mount_item(&server, "after-gap", &[]).await;
    mount_listing_status(&server, 3, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_completed, 2);
    assert_eq!(stored_titles(&config), vec!["after-gap"]);
}

/// Persister whose disk is always full
struct FailingPersister {
    attempts: AtomicU64,
}

impl Persister for FailingPersister {
    fn append(&self, _product: &Product) -> PersistResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no space left on device",
        )))
    }

    fn appended(&self) -> u64 {
        0
    }
}

#[tokio::test]
async fn test_persist_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doomed"]).await;
    mount_item(&server, "doomed", &[]).await;

    let persister = Arc::new(FailingPersister {
        attempts: AtomicU64::new(0),
    });
    let mut coordinator =
        Coordinator::with_persister(crawler_config(&server), persister.clone()).unwrap();
    let err = coordinator.run().await.unwrap_err();

    assert_eq!(persister.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(err.last_completed_page(), Some(0));
    match err {
        HarvestError::Halted { source, .. } => {
            assert!(matches!(*source, HarvestError::Persist(PersistError::Io(_))));
        }
        other => panic!("Expected Halted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resumed_crawl_appends_to_existing_stores() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("paged", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&server, &["again"])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/product/again/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html("again", &[])))
        .expect(2)
        .mount(&server)
        .await;
    mount_listing_status(&server, 2, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();
    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    // Append semantics: no deduplication across runs
    assert_eq!(stored_titles(&config), vec!["again", "again"]);
    let (_, rows) = csv_records(&config);
    assert_eq!(rows.len(), 2);
}

/// Persister that records titles in memory, taking `delay` per append
struct RecordingPersister {
    delay: Duration,
    titles: Mutex<Vec<String>>,
}

impl RecordingPersister {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            titles: Mutex::new(Vec::new()),
        }
    }

    fn titles(&self) -> Vec<String> {
        let mut titles = self.titles.lock().unwrap().clone();
        titles.sort();
        titles
    }
}

impl Persister for RecordingPersister {
    fn append(&self, product: &Product) -> PersistResult<()> {
        std::thread::sleep(self.delay);
        self.titles.lock().unwrap().push(product.title.clone());
        Ok(())
    }

    fn appended(&self) -> u64 {
        self.titles.lock().unwrap().len() as u64
    }
}

#[tokio::test]
async fn test_slow_persist_does_not_time_out_sibling_items() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["one", "two", "three"]).await;
    for slug in ["one", "two", "three"] {
        mount_item(&server, slug, &[]).await;
    }
    mount_listing_status(&server, 2, 404).await;

    // Each append outlasts the 300ms request timeout
    let persister = Arc::new(RecordingPersister::new(Duration::from_millis(400)));
    let mut coordinator =
        Coordinator::with_persister(crawler_config(&server), persister.clone()).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.total_item_failures(), 0);
    assert_eq!(stats.products_persisted, 3);
    assert_eq!(persister.titles(), vec!["one", "three", "two"]);
}

#[tokio::test]
async fn test_crawl_runs_on_spawned_task() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["spawned"]).await;
    mount_item(&server, "spawned", &[]).await;
    mount_listing_status(&server, 2, 404).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    let stats = tokio::spawn(run_crawl(config.clone(), false))
        .await
        .expect("Crawl task panicked")
        .expect("Crawl failed");

    assert_eq!(stats.products_persisted, 1);
    assert_eq!(stored_titles(&config), vec!["spawned"]);
}

#[tokio::test]
async fn test_failed_setup_leaves_stores_untouched() {
    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("products.json");
    let csv_path = dir.path().join("products.csv");
    let json_before = r#"[{"title":"Kept"}]"#;
    let csv_before = format!("{}\nKept,,,,,,,,\n", CSV_HEADERS.join(","));
    std::fs::write(&json_path, json_before).unwrap();
    std::fs::write(&csv_path, &csv_before).unwrap();

    let config = Config {
        crawler: CrawlerConfig {
            start_url: "not a url".to_string(),
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            json_path: json_path.display().to_string(),
            csv_path: csv_path.display().to_string(),
        },
    };

    let result = Coordinator::new(config, true);
    assert!(matches!(result, Err(HarvestError::UrlParse(_))));

    assert_eq!(std::fs::read_to_string(&json_path).unwrap(), json_before);
    assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), csv_before);
}

#[tokio::test]
async fn test_unreadable_listing_halts_crawl() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["never"]).await;

    let config = CrawlerConfig {
        item_selector: "a[[".to_string(),
        ..crawler_config(&server)
    };
    let persister = Arc::new(RecordingPersister::new(Duration::ZERO));
    let mut coordinator = Coordinator::with_persister(config, persister.clone()).unwrap();
    let err = coordinator.run().await.unwrap_err();

    assert_eq!(err.last_completed_page(), Some(0));
    match err {
        HarvestError::Halted { source, .. } => {
            assert!(matches!(
                *source,
                HarvestError::Listing(ListingError::InvalidSelector(_))
            ));
        }
        other => panic!("Expected Halted, got {:?}", other),
    }
    assert_eq!(
        coordinator.state(),
        CrawlState::Terminated(Termination::Fatal { page: 1 })
    );
    assert!(persister.titles().is_empty());
}
