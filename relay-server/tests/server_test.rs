//! HTTP-level tests: the axum router wired with real components against mockito servers
//! standing in for the LINE reply API and the completion endpoint.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use llm_client::{CompletionOptions, EnvLlmConfig, LlmBackend};
use mockito::Matcher;
use relay_server::{
    build_relay_components, build_router, create_store, pipeline_settings, BaseConfig,
    PipelineConfig, RelayConfig,
};
use serde_json::{json, Value};
use storage::WindowPolicy;
use tower::ServiceExt;
use webhook::compute_signature;

const SECRET: &str = "server-test-secret";

const COMPLETION_BODY: &str = r#"{
    "id": "chatcmpl-1",
    "object": "chat.completion",
    "created": 1700000000,
    "model": "gpt-4o-mini",
    "choices": [
        {
            "index": 0,
            "message": {"role": "assistant", "content": "こんにちは！"},
            "finish_reason": "stop",
            "logprobs": null
        }
    ],
    "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
}"#;

fn test_config(mock_url: &str) -> RelayConfig {
    RelayConfig {
        base: BaseConfig {
            channel_access_token: "line-token".to_string(),
            channel_secret: Some(SECRET.to_string()),
            line_api_url: mock_url.to_string(),
            skip_signature_validation: false,
            bind_addr: "127.0.0.1:0".to_string(),
            log_file: "logs/test.log".to_string(),
            store_type: "memory".to_string(),
            database_url: "sqlite::memory:".to_string(),
        },
        pipeline: PipelineConfig {
            history_limit: 10,
            rate_limit_ceiling: 100,
            rate_limit_window_hours: 72,
            search_enabled: false,
            search_result_count: 5,
            duckduckgo_api_url: format!("{}/ddg", mock_url),
            serpapi_api_key: None,
            serpapi_api_url: format!("{}/serp", mock_url),
            store_timeout_secs: 5,
            search_timeout_secs: 5,
            reply_timeout_secs: 5,
            processing_deadline_secs: 25,
        },
        llm: EnvLlmConfig {
            backend: LlmBackend::OpenAI {
                api_key: "sk-test-key-1234567890".to_string(),
                base_url: mock_url.to_string(),
            },
            model: "gpt-4o-mini".to_string(),
            options: CompletionOptions::default(),
            system_prompt: None,
            timeout: Duration::from_secs(20),
        },
    }
}

fn text_body(reply_token: &str, text: &str) -> String {
    json!({
        "destination": "Ubot",
        "events": [{
            "type": "message",
            "replyToken": reply_token,
            "source": {"type": "user", "userId": "U1"},
            "message": {"id": "m1", "type": "text", "text": text}
        }]
    })
    .to_string()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// **Test: Health probe.**
#[tokio::test]
async fn test_health() {
    let components = build_relay_components(&test_config("http://127.0.0.1:9"))
        .await
        .unwrap();
    let router = build_router(components.pipeline);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

/// **Test: Signed text webhook flows through completion and LINE reply.**
///
/// **Expected:** 200 `{"message":"OK"}`; one completion call; one reply call carrying the reply
/// token and the completion text with the channel access token.
#[tokio::test]
async fn test_signed_webhook_replies_via_line_api() {
    let mut server = mockito::Server::new_async().await;
    let completion = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(COMPLETION_BODY)
        .expect(1)
        .create_async()
        .await;
    let reply = server
        .mock("POST", "/v2/bot/message/reply")
        .match_header("authorization", "Bearer line-token")
        .match_body(Matcher::Json(json!({
            "replyToken": "r1",
            "messages": [{"type": "text", "text": "こんにちは！"}]
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let config = test_config(&server.url());
    let components = build_relay_components(&config).await.unwrap();
    let store = components.store.clone();
    let router = build_router(components.pipeline);

    let body = text_body("r1", "こんにちは");
    let signature = compute_signature(body.as_bytes(), SECRET).unwrap();
    let response = router
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("X-Line-Signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"message": "OK"}));
    completion.assert_async().await;
    reply.assert_async().await;
    assert_eq!(store.recent_history("U1", 10).await.unwrap().len(), 2);
}

/// **Test: Unsigned webhook is 401 and nothing is called.**
#[tokio::test]
async fn test_unsigned_webhook_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let reply = server
        .mock("POST", "/v2/bot/message/reply")
        .expect(0)
        .create_async()
        .await;

    let components = build_relay_components(&test_config(&server.url()))
        .await
        .unwrap();
    let router = build_router(components.pipeline);

    let response = router
        .oneshot(
            Request::post("/webhook")
                .body(Body::from(text_body("r1", "こんにちは")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({"error": "No signature header"})
    );
    reply.assert_async().await;
}

/// **Test: Image event over HTTP gets the fixed unsupported text.**
#[tokio::test]
async fn test_image_webhook_gets_fixed_reply() {
    let mut server = mockito::Server::new_async().await;
    let reply = server
        .mock("POST", "/v2/bot/message/reply")
        .match_body(Matcher::Json(json!({
            "replyToken": "r9",
            "messages": [{"type": "text", "text": webhook::UNSUPPORTED_INPUT_TEXT}]
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let components = build_relay_components(&test_config(&server.url()))
        .await
        .unwrap();
    let router = build_router(components.pipeline);
    let body = json!({
        "destination": "Ubot",
        "events": [{
            "type": "message",
            "replyToken": "r9",
            "source": {"userId": "U1"},
            "message": {"id": "m9", "type": "image"}
        }]
    })
    .to_string();
    let signature = compute_signature(body.as_bytes(), SECRET).unwrap();

    let response = router
        .oneshot(
            Request::post("/webhook")
                .header("x-line-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    reply.assert_async().await;
}

/// **Test: Base64 transfer encoding is decoded before verification.**
#[tokio::test]
async fn test_base64_encoded_webhook() {
    use base64::Engine;

    let components = build_relay_components(&test_config("http://127.0.0.1:9"))
        .await
        .unwrap();
    let router = build_router(components.pipeline);
    let body = json!({"destination": "Ubot", "events": []}).to_string();
    let signature = compute_signature(body.as_bytes(), SECRET).unwrap();
    let encoded = base64::engine::general_purpose::STANDARD.encode(body.as_bytes());

    let response = router
        .oneshot(
            Request::post("/webhook")
                .header("x-line-signature", signature)
                .header("content-transfer-encoding", "base64")
                .body(Body::from(encoded))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// **Test: SQLite store creates its parent directory.**
#[tokio::test]
async fn test_create_sqlite_store_creates_parent_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("relay.db");
    let mut config = test_config("http://127.0.0.1:9");
    config.base.store_type = "sqlite".to_string();
    config.base.database_url = format!("sqlite://{}", db_path.display());

    let store = create_store(&config).await.unwrap();
    store.upsert_user("U1").await.unwrap();
    store.close().await;

    assert!(db_path.exists());
}

/// **Test: Pipeline settings carry the deadline and survive an out-of-range rate window.**
#[test]
fn test_pipeline_settings_mapping() {
    let mut config = test_config("http://127.0.0.1:9");
    config.pipeline.processing_deadline_secs = 12;
    config.pipeline.rate_limit_window_hours = 24;

    let settings = pipeline_settings(&config);
    assert_eq!(settings.processing_deadline, Duration::from_secs(12));
    assert_eq!(settings.window_policy.window, chrono::Duration::hours(24));

    config.pipeline.rate_limit_window_hours = i64::MAX;
    let settings = pipeline_settings(&config);
    assert_eq!(settings.window_policy.window, WindowPolicy::default().window);
}
