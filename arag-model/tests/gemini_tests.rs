//! Gemini client against a local `generateContent` stand-in.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arag_core::{AragError, Content, GenerateContentConfig, Llm, LlmRequest, RetryPolicy};
use arag_model::{GeminiConfig, GeminiModel};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    api_key: Option<String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn reply(text: &str) -> (u16, Value) {
    (
        200,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }),
    )
}

fn failure(status: u16, message: &str) -> (u16, Value) {
    (status, json!({ "error": { "code": status, "message": message } }))
}

/// Answers the n-th request with `script[n]`; the last entry repeats.
async fn serve(script: Vec<(u16, Value)>, delay: Duration) -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .fallback(
            move |State(log): State<Log>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>| {
                let n = {
                    let mut log = log.lock().unwrap();
                    log.push(Seen {
                        path: uri.path().to_string(),
                        api_key: headers
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                        body,
                    });
                    log.len() - 1
                };
                let (status, body) = script.get(n).or(script.last()).cloned().unwrap();
                async move {
                    tokio::time::sleep(delay).await;
                    (StatusCode::from_u16(status).unwrap(), Json(body))
                }
            },
        )
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

fn model(base: String) -> GeminiModel {
    GeminiModel::new(GeminiConfig::new("test-key", "gemini-test").with_base_url(base).with_retry(
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        },
    ))
    .unwrap()
}

fn question() -> LlmRequest {
    LlmRequest::new("gemini-test", vec![Content::new("user").with_text("What is an agent?")])
}

#[tokio::test]
async fn request_carries_key_and_generation_config() {
    let (base, log) = serve(vec![reply("An agent acts.")], Duration::ZERO).await;

    let mut request = question().with_system_instruction("Be brief.");
    request.config = Some(GenerateContentConfig { temperature: Some(0.2), ..Default::default() });
    let response = model(base).generate_content(request).await.unwrap();

    assert_eq!(response.content.unwrap().text(), "An agent acts.");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(seen.api_key.as_deref(), Some("test-key"));
    assert_eq!(seen.body["contents"][0]["parts"][0]["text"], "What is an agent?");
    assert_eq!(seen.body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    let temperature = seen.body["generationConfig"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn rate_limit_and_server_errors_are_retried() {
    let script = vec![failure(429, "slow down"), failure(503, "overloaded"), reply("done")];
    let (base, log) = serve(script, Duration::ZERO).await;

    let response = model(base).generate_content(question()).await.unwrap();

    assert_eq!(response.content.unwrap().text(), "done");
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn persistent_server_error_surfaces_as_transient() {
    let (base, log) = serve(vec![failure(500, "backend down")], Duration::ZERO).await;

    let err = model(base).generate_content(question()).await.unwrap_err();

    assert!(matches!(&err, AragError::ModelTransient(message) if message.contains("backend down")));
    assert!(err.is_retryable());
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (base, log) = serve(vec![failure(400, "API key not valid")], Duration::ZERO).await;

    let err = model(base).generate_content(question()).await.unwrap_err();

    assert!(matches!(&err, AragError::Model(message) if message.contains("API key not valid")));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slow_server_is_a_timeout() {
    let (base, _) = serve(vec![reply("late")], Duration::from_secs(5)).await;
    let model = GeminiModel::new(
        GeminiConfig::new("test-key", "gemini-test")
            .with_base_url(base)
            .with_timeout(Duration::from_millis(100))
            .with_retry(RetryPolicy::none()),
    )
    .unwrap();

    let err = model.generate_content(question()).await.unwrap_err();
    assert!(matches!(err, AragError::Timeout { ref service, .. } if service == "Gemini"));
}
