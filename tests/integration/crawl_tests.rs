//! Integration tests for the crawler
//!
//! These tests use wiremock to serve index and detail pages and run the full
//! crawl cycle end-to-end, from config parsing to the CSV store.

use listing_crawler::config::{parse_config, Config};
use listing_crawler::crawler::run_crawl;
use listing_crawler::fetch::HttpFetcher;
use listing_crawler::state::{ExhaustReason, NavState};
use listing_crawler::storage::StorageError;
use listing_crawler::CrawlError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, store: &Path, max_pages: u32, aliases: Option<&Path>) -> Config {
    let alias_line = aliases
        .map(|p| format!("alias-path = {:?}", p.display().to_string()))
        .unwrap_or_default();

    parse_config(&format!(
        r#"
[crawl]
entry-url = "{base_url}/list"
max-pages = {max_pages}
request-delay-ms = 0
wait-timeout-ms = 10

[fetcher]
user-agent = "listing-crawler-tests/1.0"
request-timeout-secs = 5

[output]
store-path = {store:?}
{alias_line}

[selectors]
listing-links = "article h2 a"
next-page = "ul.pager a"
next-page-text = "Další"
fee-cards = "div.fees > div.card"
fee-card-label = "span.label"
fee-card-value = "strong"
parameter-tables = "div.params section"
poi-cards = "div.poi div.poiItem"

[[selectors.probe]]
field = "TYP NABÍDKY"
selector = "nav a.offer"

[[selectors.probe]]
field = "CENA"
selector = "div.price strong"
"#,
        store = store.display().to_string(),
    ))
    .expect("test config should be valid")
}

fn index_page(listings: &[&str], next: Option<&str>) -> String {
    let articles: String = listings
        .iter()
        .map(|href| format!(r#"<article><h2><a href="{href}">Byt</a></h2></article>"#))
        .collect();
    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li><a href="{href}">Další</a></li></ul>"#))
        .unwrap_or_default();
    format!("<html><body>{articles}{pager}</body></html>")
}

fn detail_page(offer: &str, price: &str) -> String {
    format!(
        r#"<html><body>
        <nav><a class="offer">{offer}</a></nav>
        <div class="price"><strong>{price}</strong></div>
        <div class="fees">
            <div class="card"><span class="label">+ Vratná kauce</span><strong>30 000 Kč</strong></div>
        </div>
        <div class="params"><section><table>
            <tr><th>STAV</th><td>Velmi dobrý</td></tr>
            <tr><th></th><td>Výtah</td></tr>
            <tr><th>Sauna</th><td>ano</td></tr>
        </table></section></div>
        <div class="poi">
            <div class="poiItem"><span class="poiItemContentType">MHD</span>
                <div class="poiItemTimes"><strong>120&nbsp;m</strong></div></div>
        </div>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Reads the store back as header + rows keyed by column name
fn read_store(path: &Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::Reader::from_path(path).expect("store should exist");
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect::<HashMap<_, _>>()
        })
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_crawl_two_listings_then_last_page() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");

    mount_page(
        &server,
        "/list",
        index_page(&["/byt/1", "/byt/2"], Some("/list/2")),
    )
    .await;
    mount_page(&server, "/list/2", index_page(&[], None)).await;
    mount_page(&server, "/byt/1", detail_page("PRODEJ", "5 000 000 Kč")).await;
    mount_page(&server, "/byt/2", detail_page("PRODEJ", "6 500 000 Kč")).await;

    let config = create_test_config(&base_url, &store, 10, None);
    let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
    let report = run_crawl(&config, fetcher).await.unwrap();

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.rows_written, 2);
    assert_eq!(
        report.termination,
        NavState::Exhausted(ExhaustReason::NoNextControl)
    );

    let (headers, rows) = read_store(&store);
    assert_eq!(headers.len(), 38);
    assert_eq!(headers[0], "Index");
    assert_eq!(headers[1], "URL");
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["Index"], "1");
    assert_eq!(rows[0]["URL"], format!("{}/byt/1", base_url));
    assert_eq!(rows[0]["CENA"], "5 000 000 Kč");
    assert_eq!(rows[0]["TYP NABÍDKY"], "PRODEJ");
    assert_eq!(rows[0]["STAV"], "Velmi dobrý");
    assert_eq!(rows[0]["Výtah"], "1");
    assert_eq!(rows[0]["MHD"], "120 m");
    assert_eq!(rows[0]["Balkón"], "NaN");
    // Sale listings skip the fee cards
    assert_eq!(rows[0]["VRATNÁ KAUCE"], "NaN");

    assert_eq!(rows[1]["Index"], "2");
    assert_eq!(rows[1]["URL"], format!("{}/byt/2", base_url));

    assert_eq!(report.stats.dropped_keys.get("Sauna"), Some(&2));
}

#[tokio::test]
async fn test_missing_listing_is_dropped() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");

    mount_page(
        &server,
        "/list",
        index_page(&["/byt/1", "/byt/gone", "/byt/3"], None),
    )
    .await;
    mount_page(&server, "/byt/1", detail_page("PRODEJ", "1 Kč")).await;
    mount_page(&server, "/byt/3", detail_page("PRODEJ", "3 Kč")).await;
    Mock::given(method("GET"))
        .and(path("/byt/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, &store, 1, None);
    let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
    let report = run_crawl(&config, fetcher).await.unwrap();

    assert_eq!(report.stats.listings_discovered, 3);
    assert_eq!(report.stats.listings_failed, 1);
    assert_eq!(report.rows_written, 2);

    let (_, rows) = read_store(&store);
    let prices: Vec<_> = rows.iter().map(|row| row["CENA"].as_str()).collect();
    assert_eq!(prices, vec!["1 Kč", "3 Kč"]);
}

#[tokio::test]
async fn test_rental_fee_cards_use_alias_table() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");
    let aliases = dir.path().join("aliases.toml");
    fs::write(
        &aliases,
        r#"
version = "test-1"

[aliases]
"Vratná kauce" = "VRATNÁ KAUCE"
"#,
    )
    .unwrap();

    mount_page(&server, "/list", index_page(&["/byt/1"], None)).await;
    mount_page(&server, "/byt/1", detail_page("PRONÁJEM", "18 000 Kč")).await;

    let config = create_test_config(&base_url, &store, 1, Some(&aliases));
    let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
    run_crawl(&config, fetcher).await.unwrap();

    let (_, rows) = read_store(&store);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["VRATNÁ KAUCE"], "30 000 Kč");
    assert_eq!(rows[0]["TYP NABÍDKY"], "PRONÁJEM");
}

#[tokio::test]
async fn test_second_run_appends_under_one_header() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");

    mount_page(&server, "/list", index_page(&["/byt/1", "/byt/2"], None)).await;
    mount_page(&server, "/byt/1", detail_page("PRODEJ", "1 Kč")).await;
    mount_page(&server, "/byt/2", detail_page("PRODEJ", "2 Kč")).await;

    let config = create_test_config(&base_url, &store, 1, None);
    for _ in 0..2 {
        let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
        run_crawl(&config, fetcher).await.unwrap();
    }

    let contents = fs::read_to_string(&store).unwrap();
    assert_eq!(
        contents
            .lines()
            .filter(|line| line.starts_with("Index,"))
            .count(),
        1
    );

    let (_, rows) = read_store(&store);
    let indices: Vec<_> = rows.iter().map(|row| row["Index"].as_str()).collect();
    let prices: Vec<_> = rows.iter().map(|row| row["CENA"].as_str()).collect();
    assert_eq!(indices, vec!["1", "2", "3", "4"]);
    assert_eq!(prices, vec!["1 Kč", "2 Kč", "1 Kč", "2 Kč"]);
}

#[tokio::test]
async fn test_foreign_store_header_fails_before_crawling() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");
    fs::write(&store, "Index,Title,Price\n1,Byt,100\n").unwrap();

    mount_page(&server, "/list", index_page(&["/byt/1"], None)).await;

    let config = create_test_config(&base_url, &store, 1, None);
    let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
    let result = run_crawl(&config, fetcher).await;

    assert!(matches!(
        result,
        Err(CrawlError::Storage(StorageError::SchemaMismatch { .. }))
    ));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
    assert_eq!(
        fs::read_to_string(&store).unwrap(),
        "Index,Title,Price\n1,Byt,100\n"
    );
}

#[tokio::test]
async fn test_page_bound_stops_traversal() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("listings.csv");

    mount_page(&server, "/list", index_page(&["/byt/1"], Some("/list/2"))).await;
    mount_page(&server, "/list/2", index_page(&["/byt/2"], Some("/list/3"))).await;
    mount_page(&server, "/list/3", index_page(&["/byt/3"], None)).await;
    for i in 1..=3 {
        mount_page(
            &server,
            &format!("/byt/{}", i),
            detail_page("PRODEJ", &format!("{} Kč", i)),
        )
        .await;
    }

    let config = create_test_config(&base_url, &store, 2, None);
    let fetcher = HttpFetcher::new(&config.fetcher).unwrap();
    let report = run_crawl(&config, fetcher).await.unwrap();

    assert_eq!(report.termination, NavState::Exhausted(ExhaustReason::PageBound));
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.rows_written, 2);
}
