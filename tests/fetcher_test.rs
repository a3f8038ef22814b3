use cinescout::config::ScraperConfig;
use cinescout::scraper::PageFetcher;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> ScraperConfig {
    ScraperConfig {
        request_timeout_secs: 5,
        ..ScraperConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Film"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Film</h1>"))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&config()).unwrap();
    let body = fetcher
        .fetch(&format!("{}/wiki/Film", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<h1>Film</h1>");
}

#[tokio::test]
async fn test_fetch_surfaces_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&config()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "server returned status 404");
}

#[tokio::test]
async fn test_fetch_with_base_url_resolves_relative_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Relative"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::with_base_url(&config(), &server.uri()).unwrap();
    let body = fetcher.fetch("/wiki/Relative").await.unwrap();
    assert_eq!(body, "ok");
}
