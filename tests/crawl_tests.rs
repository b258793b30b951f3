//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up mock HTTP servers and exercise
//! the full crawl cycle end-to-end.

use imagefinder::config::Config;
use imagefinder::{CrawlResult, Crawler};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration.
fn test_config(max_pages: usize, workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_pages = max_pages;
    config.crawler.workers = workers;
    config.crawler.crawl_delay_ms = 10;
    config
}

async fn mount_robots(server: &MockServer, content: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(content.to_string()))
        .mount(server)
        .await;
}

async fn mount_html(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.into(), "text/html"))
        .mount(server)
        .await;
}

async fn run_crawl(crawler: &Crawler) -> CrawlResult {
    tokio::time::timeout(Duration::from_secs(120), crawler.crawl())
        .await
        .expect("crawl did not terminate")
}

#[tokio::test]
async fn test_full_crawl_extracts_images() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <img src="/logo.svg" alt="Example logo" width="64" height="64">
            <img src="/photos/beach.jpg" alt="Beach at sunset" width="1600" height="900">
            <a href="/page1">one</a>
            <a href="/page2">two</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/page1",
        r#"<html><body><img src="/photos/city.jpg"></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/page2",
        r#"<html><body><div style="background-image: url('/bg/banner.png')"></div></body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(10, 2)).unwrap();
    let result = run_crawl(&crawler).await;

    let images: HashSet<&str> = result.images.iter().map(String::as_str).collect();
    assert!(images.contains(format!("{base}/logo.svg").as_str()));
    assert!(images.contains(format!("{base}/photos/beach.jpg").as_str()));
    assert!(images.contains(format!("{base}/photos/city.jpg").as_str()));
    assert!(images.contains(format!("{base}/bg/banner.png").as_str()));
    assert_eq!(images.len(), 4);

    // No duplicates in the returned list
    assert_eq!(result.images.len(), images.len());

    let logo = &result.metadata[format!("{base}/logo.svg").as_str()];
    assert!(logo.is_logo);
    assert_eq!(logo.alt_text.as_deref(), Some("Example logo"));
    assert_eq!(logo.width, 64);
    assert_eq!(logo.height, 64);
    assert_eq!(logo.page_found, format!("{base}/"));

    let photo = &result.metadata[format!("{base}/photos/beach.jpg").as_str()];
    assert!(!photo.is_logo);

    let background = &result.metadata[format!("{base}/bg/banner.png").as_str()];
    assert_eq!(background.width, -1);
    assert_eq!(background.height, -1);
    assert_eq!(background.alt_text, None);

    assert_eq!(crawler.pages_processed(), 3);
    assert!(!crawler.is_running());
}

#[tokio::test]
async fn test_tracking_param_variants_collapse() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <img src="/banner.png?utm_source=x">
            <img src="/banner.png">
        </body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(5, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    assert_eq!(result.images, vec![format!("{base}/banner.png")]);
}

#[tokio::test]
async fn test_srcset_yields_both_candidates() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body><img srcset="/a.png 1x, /b.png 2x"></body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(5, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    let images: HashSet<&str> = result.images.iter().map(String::as_str).collect();
    assert!(images.contains(format!("{base}/a.png").as_str()));
    assert!(images.contains(format!("{base}/b.png").as_str()));
}

#[tokio::test]
async fn test_robots_disallowed_path_never_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/private/page">secret</a>
            <a href="/public">open</a>
        </body></html>"#,
    )
    .await;
    mount_html(&server, "/public", "<html><body>open</body></html>").await;

    // The disallowed page must receive zero GETs
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(&base, test_config(10, 2)).unwrap();
    let _ = run_crawl(&crawler).await;

    let visited = crawler.visited_snapshot();
    assert!(!visited.contains(&format!("{base}/private/page")));
    assert!(visited.contains(&format!("{base}/public")));
}

#[tokio::test]
async fn test_cross_host_link_rejected() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="https://other.invalid/page">away</a></body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let _ = run_crawl(&crawler).await;

    let visited = crawler.visited_snapshot();
    assert_eq!(visited.len(), 1);
    assert!(visited.contains(&format!("{base}/")));
    assert_eq!(crawler.pages_processed(), 1);
}

#[tokio::test]
async fn test_redirect_followed_to_final_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/old">moved</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/new",
        r#"<html><body><img src="/moved.png"></body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    assert!(result.images.contains(&format!("{base}/moved.png")));
    // The redirect target is recorded with the page the bytes came from
    assert_eq!(
        result.metadata[&format!("{base}/moved.png")].page_found,
        format!("{base}/new")
    );
    assert!(crawler.visited_snapshot().contains(&format!("{base}/new")));
}

#[tokio::test]
async fn test_redirect_loop_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/a">loop</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/a"))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    // The loop is broken without error and yields no images
    assert!(result.images.is_empty());
    assert_eq!(crawler.pages_processed(), 2);
}

#[tokio::test]
async fn test_offsite_redirect_discarded() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/away">away</a></body></html>"#,
    )
    .await;
    // Same server, different host name: out of scope after the redirect
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("http://localhost:{port}/elsewhere").as_str()),
        )
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/elsewhere",
        r#"<html><body><img src="/offsite.png"></body></html>"#,
    )
    .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    assert!(result.images.is_empty());
}

#[tokio::test]
async fn test_non_html_content_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/report">report</a>
            <img src="/cover.png">
        </body></html>"#,
    )
    .await;
    // HTML-looking body behind a PDF content type must not be parsed
    Mock::given(method("GET"))
        .and(path("/report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><img src="/hidden.png"></body></html>"#)
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    assert_eq!(result.images, vec![format!("{base}/cover.png")]);
    assert_eq!(crawler.pages_processed(), 2);
}

#[tokio::test]
async fn test_http_error_page_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/missing">gone</a>
            <img src="/cover.png">
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let crawler = Crawler::new(&base, test_config(10, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    // The failed page is counted and skipped; the crawl carries on
    assert_eq!(result.images, vec![format!("{base}/cover.png")]);
    assert_eq!(crawler.pages_processed(), 2);
}

#[tokio::test]
async fn test_body_capped_at_one_mebibyte() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    let filler = "a".repeat(1_200_000);
    mount_html(
        &server,
        "/",
        format!(
            r#"<html><body><img src="/early.png"><!-- {filler} --><img src="/late.png"></body></html>"#
        ),
    )
    .await;

    let crawler = Crawler::new(&base, test_config(5, 1)).unwrap();
    let result = run_crawl(&crawler).await;

    assert!(result.images.contains(&format!("{base}/early.png")));
    assert!(!result.images.contains(&format!("{base}/late.png")));
}

#[tokio::test]
async fn test_max_pages_zero_returns_immediately() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(&server, "/", "<html><body><img src='/a.png'></body></html>").await;

    let crawler = Crawler::new(&base, test_config(0, 2)).unwrap();
    let result = run_crawl(&crawler).await;

    assert!(result.images.is_empty());
    assert_eq!(crawler.pages_processed(), 0);
}

#[tokio::test]
async fn test_worker_counts_agree_on_image_set() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <img src="/i0.png">
            <a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a>
        </body></html>"#,
    )
    .await;
    for (route, img) in [("/p1", "/i1.png"), ("/p2", "/i2.png"), ("/p3", "/i3.png")] {
        mount_html(
            &server,
            route,
            format!(r#"<html><body><img src="{img}"></body></html>"#),
        )
        .await;
    }

    let single = Crawler::new(&base, test_config(20, 1)).unwrap();
    let serial: HashSet<String> = run_crawl(&single).await.images.into_iter().collect();

    let several = Crawler::new(&base, test_config(20, 4)).unwrap();
    let parallel: HashSet<String> = run_crawl(&several).await.images.into_iter().collect();

    assert_eq!(serial.len(), 4);
    assert_eq!(serial, parallel);
}

#[tokio::test]
async fn test_stop_terminates_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    let links: String = (0..30)
        .map(|i| format!(r#"<a href="/slow/{i}">{i}</a>"#))
        .collect();
    mount_html(&server, "/", format!("<html><body>{links}</body></html>")).await;
    for i in 0..30 {
        Mock::given(method("GET"))
            .and(path(format!("/slow/{i}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>slow</body></html>")
                    .insert_header("content-type", "text/html")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }

    let crawler = Arc::new(Crawler::new(&base, test_config(100, 2)).unwrap());
    let handle = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.crawl().await })
    };

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(crawler.is_running());
    crawler.stop();

    let _result = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("stop was not observed in time")
        .expect("crawl task panicked");

    assert!(!crawler.is_running());
    // The budget was far from spent when the stop landed
    assert!(crawler.pages_processed() < 31);
}

#[tokio::test]
async fn test_reentrant_crawl_returns_partial_results() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "").await;
    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/slow/{i}">{i}</a>"#))
        .collect();
    mount_html(
        &server,
        "/",
        format!(r#"<html><body><img src="/first.png">{links}</body></html>"#),
    )
    .await;
    for i in 0..10 {
        Mock::given(method("GET"))
            .and(path(format!("/slow/{i}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>slow</body></html>")
                    .insert_header("content-type", "text/html")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }

    let crawler = Arc::new(Crawler::new(&base, test_config(100, 1)).unwrap());
    let handle = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.crawl().await })
    };

    // Give the first crawl time to process the index page
    tokio::time::sleep(Duration::from_millis(800)).await;

    // A second crawl on a running session hands back current results
    let partial = crawler.crawl().await;
    assert!(partial.images.contains(&format!("{base}/first.png")));

    crawler.stop();
    let _ = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("stop was not observed in time");
}
