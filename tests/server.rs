//! Web UI tests: the real router on an ephemeral port, driven by reqwest.

#![cfg(feature = "server")]

mod common;

use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use common::{
    completion, config_for, docx, report_lines, spawn_mock_llm, spawn_slow_mock_llm, MockLlm,
};
use debate_coach::server::router;
use debate_coach::CoachConfig;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

async fn spawn_app(config: CoachConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(config)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn app_with_feedback(feedback: &str) -> (String, MockLlm) {
    let mock = spawn_mock_llm(StatusCode::OK, completion(feedback)).await;
    let app = spawn_app(config_for(&mock)).await;
    (app, mock)
}

fn upload(name: &str, bytes: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()))
}

#[tokio::test]
async fn health_and_index() {
    let (app, _mock) = app_with_feedback("- unused").await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{app}/api/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "OK");

    let index = client.get(format!("{app}/")).send().await.unwrap().text().await.unwrap();
    assert!(index.contains("accept=\".pdf,.docx\""));
    assert!(index.contains("enctype=\"multipart/form-data\""));
}

#[tokio::test]
async fn json_review_returns_feedback_and_pdf() {
    let (app, mock) = app_with_feedback("- point one\n- point two").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review"))
        .multipart(upload("case.docx", docx(&["We stand in firm proposition."])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["feedback"]["content"], "- point one\n- point two");
    assert_eq!(body["feedback"]["transport"], "http");
    assert_eq!(body["stats"]["extracted_chars"], 29);

    let pdf = STANDARD
        .decode(body["pdf_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(report_lines(&pdf), vec!["- point one", "- point two"]);
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn pdf_route_returns_attachment() {
    let (app, _mock) = app_with_feedback("- concise").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review/pdf"))
        .multipart(upload("case.docx", docx(&["Opposition case."])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"Debate_Feedback.pdf\""
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn html_review_escapes_feedback_and_links_download() {
    let (app, _mock) = app_with_feedback("- <script>alert(1)</script> is not evidence").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/review"))
        .multipart(upload("case.docx", docx(&["Proposition."])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("download=\"Debate_Feedback.pdf\""));
    assert!(html.contains("data:application/pdf;base64,"));
}

#[tokio::test]
async fn unsupported_type_is_415() {
    let (app, mock) = app_with_feedback("- unused").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review"))
        .multipart(upload("notes.txt", b"plain text".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "unsupported_format");
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn empty_document_is_422_with_message() {
    let (app, _mock) = app_with_feedback("- unused").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/review"))
        .multipart(upload("blank.docx", docx(&["  "])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Could not extract text. Please check the file."));
}

#[tokio::test]
async fn upstream_failure_is_502() {
    let mock = spawn_mock_llm(StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({})).await;
    let app = spawn_app(config_for(&mock)).await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review"))
        .multipart(upload("case.docx", docx(&["Argument."])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "feedback");
    assert!(body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn missing_file_field_is_400() {
    let (app, _mock) = app_with_feedback("- unused").await;

    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review"))
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let mock = spawn_mock_llm(StatusCode::OK, completion("- unused")).await;
    let config = CoachConfig::builder()
        .api_base_url(&mock.base_url)
        .api_key("sk-test")
        .max_upload_bytes(1024)
        .build()
        .unwrap();
    let app = spawn_app(config).await;

    let mut big = b"%PDF-1.5\n".to_vec();
    big.resize(8 * 1024, b' ');
    let resp = reqwest::Client::new()
        .post(format!("{app}/api/review"))
        .multipart(upload("big.pdf", big))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn concurrent_reviews_are_served_one_at_a_time() {
    let delay = Duration::from_millis(300);
    let mock = spawn_slow_mock_llm(StatusCode::OK, completion("- queued"), delay).await;
    let app = spawn_app(config_for(&mock)).await;
    let client = reqwest::Client::new();

    let send = |name: &'static str| {
        let request = client
            .post(format!("{app}/api/review"))
            .multipart(upload(name, docx(&["Argument."])));
        async move { request.send().await.unwrap().status() }
    };

    let started = Instant::now();
    let (first, second) = tokio::join!(send("first.docx"), send("second.docx"));

    assert_eq!(first, 200);
    assert_eq!(second, 200);
    assert_eq!(mock.requests().len(), 2);
    assert_eq!(mock.peak_concurrency(), 1, "reviews overlapped at the model");
    assert!(started.elapsed() >= delay * 2);
}
