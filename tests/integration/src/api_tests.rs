//! HTTP API tests: validation, error envelopes and prompt generation

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use bench_config::HarnessConfig;
use serde_json::json;

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::with_default_config().await;

    let response = server.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_job_missing_fields_rejected_before_any_request() {
    let mock = MockOpenAI::new().await;
    mock.mock_streaming_response(&["never"]).await;
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/benchmark", &json!({"prompts": ["p"], "apiUrl": mock.url()}))
        .await;
    assert_eq!(response.status(), 400);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["type"], "validation_error");
    let details = body["error"]["details"].as_array().unwrap();
    assert!(details.contains(&json!("apiKey")));
    assert!(details.contains(&json!("model")));
    assert_eq!(mock.calls().await, 0);
}

#[tokio::test]
async fn test_job_with_invalid_url_rejected() {
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/benchmark", &job_with_prompts("not a url", &["p"], json!(1)))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_malformed_json_body_rejected() {
    let server = TestServer::with_default_config().await;

    let response = server
        .client
        .post(server.url("/api/benchmark"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_job_over_prompt_limit_rejected() {
    let mut config = HarnessConfig::default();
    config.job.max_prompts = 2;
    let server = TestServer::new(config).await;

    let body = job_with_prompts("http://127.0.0.1:1", &["a", "b", "c"], json!(1));
    let response = server.post_json("/api/benchmark", &body).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_huge_repetition_count_rejected() {
    let mock = MockOpenAI::new().await;
    let server = TestServer::with_default_config().await;

    let body = json!({
        "prompt": "p",
        "numRequests": u64::MAX / 2,
        "apiUrl": mock.url(),
        "apiKey": TEST_API_KEY,
        "model": TEST_MODEL
    });
    let response = server.post_json("/api/benchmark", &body).await;
    assert_eq!(response.status(), 400);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["details"], json!(["numRequests"]));
    assert_eq!(mock.calls().await, 0);
}

#[tokio::test]
async fn test_generate_prompts_strict() {
    let mock = MockOpenAI::new().await;
    mock.mock_structured_content(&prompts_content(&["What is Mars?", "How hot is Venus?"]))
        .await;
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/generate-prompts", &generate_request(&mock.url(), 5, "strict"))
        .await;
    assert_eq!(response.status(), 200);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["prompts"], json!(["What is Mars?", "How hot is Venus?"]));

    let sent = mock.request_bodies().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["response_format"]["json_schema"]["strict"], true);
    assert_eq!(
        sent[0]["response_format"]["json_schema"]["schema"]["properties"]["prompts"]["maxItems"],
        5
    );
}

#[tokio::test]
async fn test_generate_prompts_strict_schema_failure() {
    let mock = MockOpenAI::new().await;
    mock.mock_structured_content(&prompts_content(&["a", "b", "c"])).await;
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/generate-prompts", &generate_request(&mock.url(), 2, "strict"))
        .await;
    assert_eq!(response.status(), 422);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["type"], "schema_validation_failed");
    assert!(!body["error"]["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_prompts_lenient_falls_back() {
    let mock = MockOpenAI::new().await;
    mock.mock_structured_content("I cannot produce JSON today").await;
    mock.mock_unstructured_content(
        "Here you go:\n```json\n{\"prompts\": [\"Name the moons of Mars\", 42]}\n```",
    )
    .await;
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/generate-prompts", &generate_request(&mock.url(), 3, "lenient"))
        .await;
    assert_eq!(response.status(), 200);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["prompts"], json!(["Name the moons of Mars", "42"]));
    assert_eq!(mock.calls().await, 2);
}

#[tokio::test]
async fn test_generate_prompts_lenient_total_failure() {
    let mock = MockOpenAI::new().await;
    mock.mock_unstructured_content("no prompts here").await;
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json("/api/generate-prompts", &generate_request(&mock.url(), 3, "lenient"))
        .await;
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_generate_prompts_zero_count_rejected() {
    let server = TestServer::with_default_config().await;

    let response = server
        .post_json(
            "/api/generate-prompts",
            &generate_request("http://127.0.0.1:1", 0, "strict"),
        )
        .await;
    assert_eq!(response.status(), 400);
}
