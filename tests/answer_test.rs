use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use uploadgpt::config::AppConfig;
use uploadgpt::services::answer::{AnswerError, AnswerRequest, AnswerRequester, GeminiClient};

#[derive(Clone, Default)]
struct Captured {
    calls: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate_content(
    State(captured): State<Captured>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.calls.lock().unwrap().push((model, key, body));

    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": "Option C " }, { "text": "is correct." }]
            },
            "finishReason": "STOP"
        }]
    }))
}

async fn rate_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "Resource has been exhausted")
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: String, dir: &tempfile::TempDir) -> GeminiClient {
    let mut config = AppConfig::development(dir.path());
    config.gemini_api_key = Some("test-key".to_string());
    config.gemini_base_url = base_url;
    GeminiClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_sends_prompt_and_inline_file() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/v1beta/models/:model", post(generate_content))
        .with_state(captured.clone());
    let base_url = spawn_server(router).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%minimal").unwrap();

    let client = client_for(base_url, &dir);
    let answer = client
        .ask(&AnswerRequest {
            path,
            prompt: "please answer this".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(answer, "Option C is correct.");

    let calls = captured.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (model, key, body) = &calls[0];
    assert_eq!(model, "gemini-2.5-flash:generateContent");
    assert_eq!(key.as_deref(), Some("test-key"));

    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], "please answer this");
    assert_eq!(parts[1]["inline_data"]["mime_type"], "application/pdf");
    let data = STANDARD
        .decode(parts[1]["inline_data"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(data, b"%PDF-1.4\n%minimal");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let router = Router::new().route("/v1beta/models/:model", post(rate_limited));
    let base_url = spawn_server(router).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.png");
    std::fs::write(&path, b"png-ish").unwrap();

    let err = client_for(base_url, &dir)
        .ask(&AnswerRequest {
            path,
            prompt: "q".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        AnswerError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "Resource has been exhausted");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = client_for("http://127.0.0.1:9".to_string(), &dir)
        .ask(&AnswerRequest {
            path: dir.path().join("gone.png"),
            prompt: "q".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AnswerError::FileNotFound(_)));
}
