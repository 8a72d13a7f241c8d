//! Batch pipeline runs against a local image server.

use partgrab::batch::{self, BatchSummary};
use partgrab::config::{BatchConfig, DownloadConfig};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fakejpegdata";

fn quick_config(dir: &Path, input: &Path) -> BatchConfig {
    BatchConfig {
        input: input.to_path_buf(),
        out_dir: dir.join("images"),
        failure_log: dir.join("failed_downloads.csv"),
        concurrency: 8,
        download: DownloadConfig {
            retries: 3,
            retry_delay: Duration::from_millis(5),
            request_timeout: Duration::from_secs(5),
        },
    }
}

fn image_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "image/jpeg")
        .set_body_bytes(JPEG_BYTES)
}

#[tokio::test]
async fn downloads_sanitizes_and_logs_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .respond_with(image_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("urls.csv");
    std::fs::write(
        &input,
        format!(
            "part_number,image_url,image_url_2\n\
             A:100,{origin}/a.jpg,\n\
             B200,{origin}/gone.jpg,\n\
             C300,not-a-url,\n",
            origin = server.uri()
        ),
    )
    .unwrap();

    let cfg = quick_config(dir.path(), &input);
    let summary = batch::run(&cfg).await.unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            downloaded: 1,
            skipped: 3, // the three empty second-column cells
            failed: 2
        }
    );

    // Unsafe characters in the identifier are replaced in the filename.
    let written = std::fs::read(cfg.out_dir.join("A_100.jpg")).unwrap();
    assert_eq!(written, JPEG_BYTES);

    let log = std::fs::read_to_string(&cfg.failure_log).unwrap();
    let mut lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.remove(0), "part_number,image_url,reason");
    lines.sort_unstable();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("B200,") && lines[0].ends_with(",status 404"));
    assert!(lines[1].starts_with("C300,not-a-url,invalid URL"));
}

#[tokio::test]
async fn second_url_column_gets_an_index_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(image_response())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("urls.csv");
    std::fs::write(
        &input,
        format!(
            "part_number,front,back\nA100,{origin}/f.jpg,{origin}/b.jpg\n",
            origin = server.uri()
        ),
    )
    .unwrap();

    let cfg = quick_config(dir.path(), &input);
    let summary = batch::run(&cfg).await.unwrap();
    assert_eq!(summary.downloaded, 2);
    assert!(cfg.out_dir.join("A100.jpg").exists());
    assert!(cfg.out_dir.join("A100_1.jpg").exists());
}

#[tokio::test]
async fn repeated_part_number_rows_keep_counting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(image_response())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("urls.csv");
    std::fs::write(
        &input,
        format!(
            "part_number,image_url\n\
             A100,{origin}/front.jpg\n\
             A100,{origin}/back.jpg\n",
            origin = server.uri()
        ),
    )
    .unwrap();

    let cfg = quick_config(dir.path(), &input);
    let summary = batch::run(&cfg).await.unwrap();

    // The second row must not collide with the first row's file.
    assert_eq!(
        summary,
        BatchSummary {
            downloaded: 2,
            skipped: 0,
            failed: 0
        }
    );
    assert!(cfg.out_dir.join("A100.jpg").exists());
    assert!(cfg.out_dir.join("A100_1.jpg").exists());
    assert!(!cfg.failure_log.exists());
}

#[tokio::test]
async fn existing_output_is_skipped_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(image_response())
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("urls.csv");
    std::fs::write(
        &input,
        format!("part_number,image_url\nA100,{}/a.jpg\n", server.uri()),
    )
    .unwrap();

    let cfg = quick_config(dir.path(), &input);
    std::fs::create_dir_all(&cfg.out_dir).unwrap();
    std::fs::write(cfg.out_dir.join("A100.jpg"), b"already here").unwrap();

    let summary = batch::run(&cfg).await.unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            downloaded: 0,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(
        std::fs::read(cfg.out_dir.join("A100.jpg")).unwrap(),
        b"already here"
    );
}
