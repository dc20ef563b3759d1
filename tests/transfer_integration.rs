//! Integration tests for the transfer pipeline.
//!
//! These tests run both legs against wiremock servers and check what the
//! destination actually received.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use reqwest::StatusCode;
use serde_json::json;
use stream_relay::transfer::{
    ReqwestTransport, Transport, TransferOutcome, TransferParams, TransportError, UploadRequest,
};
use stream_relay::{HeaderSpec, HttpSettings, TransferError, TransferOrchestrator, UploadMethod};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator() -> TransferOrchestrator {
    TransferOrchestrator::with_settings(&HttpSettings::default())
        .expect("failed to build orchestrator")
}

/// Helper to create a mock server serving `content` at `path_str`.
async fn setup_source(path_str: &str, content: &[u8]) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&mock_server)
        .await;

    mock_server
}

fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn uploaded_body(server: &MockServer, upload_path: &str) -> Vec<u8> {
    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");
    requests
        .into_iter()
        .find(|r| r.url.path() == upload_path)
        .expect("upload request received")
        .body
}

#[tokio::test]
async fn test_transfer_success_streams_body_and_parses_json_response() {
    let content = patterned_bytes(500);
    let server = setup_source("/file.bin", &content).await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let outcome = orchestrator()
        .execute(&params)
        .await
        .expect("transfer should succeed");

    let record = outcome.into_record();
    assert!(record.success);
    assert_eq!(record.download_status, Some(200));
    assert_eq!(record.upload_status, Some(201));
    assert_eq!(record.upload_response, Some(json!({"id": "abc"})));
    assert!(record.error.is_none());
    assert_eq!(uploaded_body(&server, "/upload").await, content);
}

#[tokio::test]
async fn test_transfer_large_body_is_byte_exact() {
    let content = patterned_bytes(5 * 1024 * 1024 + 17);
    let server = setup_source("/large.bin", &content).await;
    Mock::given(method("PUT"))
        .and(path("/store"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/large.bin", server.uri()),
        format!("{}/store", server.uri()),
    )
    .method(UploadMethod::Put);
    let outcome = orchestrator().execute(&params).await.expect("transfer");

    assert!(outcome.is_success());
    let received = uploaded_body(&server, "/store").await;
    assert_eq!(received.len(), content.len());
    assert!(received == content, "uploaded bytes differ from source");
}

#[tokio::test]
async fn test_transfer_forwards_source_content_length() {
    let content = patterned_bytes(2048);
    let server = setup_source("/file.bin", &content).await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("content-length", "2048"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let record = orchestrator()
        .execute(&params)
        .await
        .expect("transfer")
        .into_record();

    assert!(record.success);
}

#[tokio::test]
async fn test_transfer_explicit_upload_content_length_is_not_overridden() {
    let content = patterned_bytes(300);
    let server = setup_source("/file.bin", &content).await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("content-length", "300"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    )
    .upload_headers(HeaderSpec::text(r#"{"Content-Length": "300"}"#))
    .content_length(1_048_576);
    let outcome = orchestrator().execute(&params).await.expect("transfer");

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_transfer_sends_default_and_custom_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .and(header("accept", "*/*"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("content-type", "application/octet-stream"))
        .and(header("x-tag", "7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    )
    .download_headers(HeaderSpec::text(r#"{"X-Api-Key": "secret"}"#))
    .upload_headers(HeaderSpec::from(json!({"X-Tag": 7})));
    let outcome = orchestrator().execute(&params).await.expect("transfer");

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_transfer_injects_bearer_from_upload_url() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(query_param("bearer", "tok123"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload?bearer=tok123", server.uri()),
    );
    let outcome = orchestrator().execute(&params).await.expect("transfer");

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_transfer_explicit_authorization_wins_over_bearer() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("authorization", "Basic abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload?bearer=tok123", server.uri()),
    )
    .upload_headers(HeaderSpec::text(r#"{"authorization": "Basic abc"}"#));
    let outcome = orchestrator().execute(&params).await.expect("transfer");

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_transfer_download_404_soft_failure_skips_upload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let download_url = format!("{}/missing", server.uri());
    let upload_url = format!("{}/upload", server.uri());
    let params =
        TransferParams::new(download_url.as_str(), upload_url.as_str()).throw_on_error(false);
    let outcome = orchestrator().execute(&params).await.expect("soft failure");

    let TransferOutcome::SoftFailure(failure) = outcome else {
        panic!("expected soft failure");
    };
    assert_eq!(failure.download_status, Some(404));
    assert_eq!(failure.upload_status, None);
    assert_eq!(failure.download_url, download_url);
    assert_eq!(failure.upload_url, upload_url);
    assert_eq!(
        failure.message,
        format!("Download failed with HTTP 404 from {download_url}: Not Found")
    );
}

#[tokio::test]
async fn test_transfer_download_404_hard_failure_skips_upload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/missing", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let error = orchestrator().execute(&params).await.unwrap_err();

    assert!(matches!(error, TransferError::DownloadStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_transfer_upload_401_soft_failure() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .mount(&server)
        .await;

    let upload_url = format!("{}/upload", server.uri());
    let params = TransferParams::new(format!("{}/file.bin", server.uri()), upload_url.as_str())
        .throw_on_error(false);
    let record = orchestrator()
        .execute(&params)
        .await
        .expect("soft failure")
        .into_record();

    assert!(!record.success);
    assert_eq!(record.download_status, Some(200));
    assert_eq!(record.upload_status, Some(401));
    assert_eq!(
        record.error.as_deref(),
        Some(format!("Upload failed with HTTP 401 to {upload_url}: Unauthorized").as_str())
    );
}

#[tokio::test]
async fn test_transfer_upload_500_hard_failure() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let error = orchestrator().execute(&params).await.unwrap_err();

    assert_eq!(error.upload_status_code(), Some(500));
    assert_eq!(error.download_status_code(), Some(200));
}

#[tokio::test]
async fn test_transfer_follows_download_redirect() {
    let server = setup_source("/file.bin", b"redirected payload").await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/file.bin"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/old", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let record = orchestrator()
        .execute(&params)
        .await
        .expect("transfer")
        .into_record();

    assert!(record.success);
    assert_eq!(record.download_status, Some(200));
    assert_eq!(uploaded_body(&server, "/upload").await, b"redirected payload");
}

#[tokio::test]
async fn test_transfer_does_not_follow_upload_redirect() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    )
    .throw_on_error(false);
    let record = orchestrator()
        .execute(&params)
        .await
        .expect("soft failure")
        .into_record();

    assert!(!record.success);
    assert_eq!(record.upload_status, Some(307));
}

#[tokio::test]
async fn test_transfer_plain_text_upload_response_is_string() {
    let server = setup_source("/file.bin", b"data").await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored ok"))
        .mount(&server)
        .await;

    let params = TransferParams::new(
        format!("{}/file.bin", server.uri()),
        format!("{}/upload", server.uri()),
    );
    let record = orchestrator()
        .execute(&params)
        .await
        .expect("transfer")
        .into_record();

    assert_eq!(record.upload_response, Some(json!("stored ok")));
}

#[tokio::test]
async fn test_transfer_connection_refused_is_enriched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Port 1 is reserved and has no listener in test environments.
    let download_url = "http://127.0.0.1:1/file.bin".to_string();
    let upload_url = format!("{}/upload", server.uri());

    let soft =
        TransferParams::new(download_url.as_str(), upload_url.as_str()).throw_on_error(false);
    let record = orchestrator()
        .execute(&soft)
        .await
        .expect("soft failure")
        .into_record();
    assert!(!record.success);
    assert_eq!(record.download_status, None);
    assert!(record.error.as_deref().unwrap_or_default().contains(&download_url));

    let hard = TransferParams::new(download_url.as_str(), upload_url.as_str());
    let error = orchestrator().execute(&hard).await.unwrap_err();
    assert!(matches!(
        error,
        TransferError::Transport {
            source: TransportError::Network { .. } | TransportError::Timeout { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_transfer_invalid_header_names_both_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let download_url = format!("{}/file.bin", server.uri());
    let upload_url = format!("{}/upload", server.uri());
    let params = TransferParams::new(download_url.as_str(), upload_url.as_str())
        .download_headers(HeaderSpec::text(r#"{"Bad Header": "x"}"#));
    let error = orchestrator().execute(&params).await.unwrap_err();

    let message = error.to_string();
    assert!(message.contains("invalid request header"), "{message}");
    assert!(message.contains(&download_url), "{message}");
    assert!(message.contains(&upload_url), "{message}");
}

#[tokio::test]
async fn test_transfer_rejects_non_http_scheme_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let params = TransferParams::new("ftp://example.com/file", format!("{}/upload", server.uri()))
        .throw_on_error(false);
    let error = orchestrator().execute(&params).await.unwrap_err();

    assert!(matches!(error, TransferError::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_upload_outlasting_read_timeout_completes_while_body_moves() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let settings = HttpSettings {
        read_timeout: Duration::from_secs(1),
        ..HttpSettings::default()
    };
    let transport = ReqwestTransport::http(&settings).expect("transport");

    // 15 chunks, 200 ms apart: about 3 s of upload against a 1 s idle limit.
    let body = stream::unfold(0_u8, |sent| async move {
        if sent == 15 {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        Some((Ok::<_, std::io::Error>(Bytes::from(vec![sent; 1024])), sent + 1))
    })
    .boxed();

    let response = transport
        .upload(UploadRequest {
            url: format!("{}/slow", server.uri()).parse().expect("url"),
            method: UploadMethod::Post,
            headers: Default::default(),
            body,
        })
        .await
        .expect("upload should not time out while the body is moving");

    assert_eq!(response.status, Some(StatusCode::OK));
    let received = uploaded_body(&server, "/slow").await;
    assert_eq!(received.len(), 15 * 1024);
    assert!(received.ends_with(&[14_u8; 1024]));
}
