//! Download semantics against a local HTTP server.

use partgrab::config::DownloadConfig;
use partgrab::fetcher::Fetcher;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fakejpegdata";

fn quick_config() -> DownloadConfig {
    DownloadConfig {
        retries: 3,
        retry_delay: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
    }
}

fn image_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "image/jpeg")
        .set_body_bytes(JPEG_BYTES)
}

#[tokio::test]
async fn success_writes_positional_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/a.jpg"))
        .respond_with(image_response())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Fetcher::new(Some(origin), quick_config());

    let count = fetcher
        .fetch_all("A100", &["/img/a.jpg".to_string()], dir.path())
        .await;
    assert_eq!(count, 1);

    let written = std::fs::read(dir.path().join("A100_1.jpg")).unwrap();
    assert_eq!(written, JPEG_BYTES);
}

#[tokio::test]
async fn html_content_type_is_never_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/a.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>not found page</html>"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Fetcher::new(Some(origin), quick_config());

    let count = fetcher
        .fetch_all("A100", &["/img/a.jpg".to_string()], dir.path())
        .await;
    assert_eq!(count, 0);
    assert!(!dir.path().join("A100_1.jpg").exists());
}

#[tokio::test]
async fn retry_budget_exhausts_before_a_late_success() {
    let server = MockServer::start().await;
    // Three transport-level failures, then the URL would succeed. With a
    // budget of 3 the success is never reached.
    Mock::given(method("GET"))
        .and(path("/img/a.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/a.jpg"))
        .respond_with(image_response())
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Fetcher::new(Some(origin), quick_config());

    let count = fetcher
        .fetch_all("A100", &["/img/a.jpg".to_string()], dir.path())
        .await;
    assert_eq!(count, 0);
    assert!(!dir.path().join("A100_1.jpg").exists());
}

#[tokio::test]
async fn one_bad_url_does_not_sink_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.jpg"))
        .respond_with(image_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Fetcher::new(Some(origin), quick_config());

    let urls = vec!["/gone.jpg".to_string(), "/ok.jpg".to_string()];
    let count = fetcher.fetch_all("A100", &urls, dir.path()).await;
    assert_eq!(count, 1);

    // Position reflects the URL's place in the list, not the success count.
    assert!(!dir.path().join("A100_1.jpg").exists());
    assert!(dir.path().join("A100_2.jpg").exists());
}

#[tokio::test]
async fn existing_file_is_overwritten() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/a.jpg"))
        .respond_with(image_response())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("A100_1.jpg"), b"stale").unwrap();

    let origin = Url::parse(&server.uri()).unwrap();
    let fetcher = Fetcher::new(Some(origin), quick_config());
    let count = fetcher
        .fetch_all("A100", &["/img/a.jpg".to_string()], dir.path())
        .await;
    assert_eq!(count, 1);
    assert_eq!(std::fs::read(dir.path().join("A100_1.jpg")).unwrap(), JPEG_BYTES);
}
