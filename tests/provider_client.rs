//! Tests for the provider client against a mock chat completions server
//!
//! Covers request shape, the status-to-error taxonomy and the best-effort
//! response cache.

mod common;

use city_directory::config::ProviderConfig;
use city_directory::provider::{DataSource, PerplexityClient, build_prompt, cache_path_for};
use city_directory::storage::{ContentStore, FsContentStore};
use city_directory::FetchError;
use common::{APPRAISER_TEXT, TEST_API_KEY, chat_response, provider_config, wait_for_blobs};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> PerplexityClient {
    PerplexityClient::new(provider_config(&server.uri())).unwrap()
}

async fn respond_with(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn fetch_sends_deterministic_request_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "model": "sonar-reasoning-pro",
            "temperature": 0.2,
            "top_p": 0.9,
            "search_recency_filter": "year",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be precise and concise."},
                {"role": "user", "content": build_prompt("Chicago", "Illinois")}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(APPRAISER_TEXT)))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap();

    assert_eq!(text, APPRAISER_TEXT);
}

#[tokio::test]
async fn unauthorized_maps_to_unauthorized() {
    let server = respond_with(
        ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
    )
    .await;

    let err = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap_err();

    assert_eq!(err, FetchError::Unauthorized);
}

#[tokio::test]
async fn throttling_maps_to_rate_limited() {
    let server = respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests")).await;

    let err = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap_err();

    assert_eq!(err, FetchError::RateLimited);
    assert!(err.to_string().contains("rate limit"));
}

#[tokio::test]
async fn other_statuses_carry_the_provider_message() {
    let server = respond_with(
        ResponseTemplate::new(500)
            .set_body_json(json!({"error": {"message": "model overloaded", "code": 500}})),
    )
    .await;

    let err = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap_err();

    assert_eq!(err, FetchError::Provider("model overloaded".to_string()));
}

#[tokio::test]
async fn blank_or_missing_content_is_an_empty_response() {
    for body in [
        chat_response("   "),
        json!({"choices": []}),
        json!({"choices": [{"message": {"role": "assistant"}}]}),
    ] {
        let server = respond_with(ResponseTemplate::new(200).set_body_json(body.clone())).await;

        let err = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap_err();

        assert_eq!(err, FetchError::EmptyResponse, "body: {body}");
    }
}

#[tokio::test]
async fn malformed_body_is_a_provider_error() {
    let server = respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

    let err = client_for(&server).await.fetch("Chicago", "Illinois").await.unwrap_err();

    match err {
        FetchError::Provider(msg) => assert!(msg.starts_with("malformed response"), "got: {msg}"),
        other => panic!("expected Provider, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let config = ProviderConfig {
        api_url: "http://127.0.0.1:1/chat/completions".to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        timeout: Duration::from_secs(2),
        ..ProviderConfig::default()
    };
    let client = PerplexityClient::new(config).unwrap();

    let err = client.fetch("Chicago", "Illinois").await.unwrap_err();

    assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn successful_result_is_cached_in_the_background() {
    let server = respond_with(ResponseTemplate::new(200).set_body_json(chat_response(APPRAISER_TEXT))).await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::new(dir.path()));
    let client = client_for(&server).await.with_cache(store.clone());

    client.fetch("Chicago", "Illinois").await.unwrap();

    assert!(wait_for_blobs(store.as_ref(), "perplexity/", 1, Duration::from_secs(5)).await);
    let prompt = build_prompt("Chicago", "Illinois");
    let cache_path = cache_path_for("antique_appraiser", &prompt);
    let cached = store.get(&cache_path).await.unwrap();
    assert_eq!(cached["prompt"], prompt.as_str());
    assert_eq!(cached["result"], APPRAISER_TEXT);
    assert_eq!(cached["type"], "antique_appraiser");

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(&cache_path)).unwrap()).unwrap();
    assert_eq!(raw["metadata"]["type"], "perplexity_result");
    assert_eq!(raw["metadata"]["resultType"], "antique_appraiser");
}

#[tokio::test]
async fn cache_can_be_disabled() {
    let server = respond_with(ResponseTemplate::new(200).set_body_json(chat_response(APPRAISER_TEXT))).await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::new(dir.path()));
    let config = ProviderConfig {
        cache_results: false,
        ..provider_config(&server.uri())
    };
    let client = PerplexityClient::new(config).unwrap().with_cache(store.clone());

    client.fetch("Chicago", "Illinois").await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.list_by_prefix("perplexity/").await.unwrap().is_empty());
}

#[tokio::test]
async fn cache_failure_does_not_fail_the_call() {
    let server = respond_with(ResponseTemplate::new(200).set_body_json(chat_response(APPRAISER_TEXT))).await;
    let dir = tempfile::tempdir().unwrap();
    // a regular file as the store root makes every write fail
    let root = dir.path().join("not-a-dir");
    std::fs::write(&root, b"").unwrap();
    let client = client_for(&server)
        .await
        .with_cache(Arc::new(FsContentStore::new(&root)));

    let text = client.fetch("Chicago", "Illinois").await.unwrap();

    assert_eq!(text, APPRAISER_TEXT);
}
