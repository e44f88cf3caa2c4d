//! OpenAI-compatible providers against a local stub server.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pdfchat_rag::{
    EmbeddingProvider, GenerationParams, LanguageModel, OpenAIChatModel, OpenAIConfig,
    OpenAIEmbeddingProvider, RagError,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Recorded {
    fn push(&self, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((auth, body));
    }

    fn all(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Answers each input with `[position, length]`, listing the items in
/// reverse order so clients have to sort by `index`.
async fn embeddings(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let inputs: Vec<String> = body["input"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    recorded.push(&headers, body);

    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| json!({ "index": i, "embedding": [i as f32, text.len() as f32] }))
        .collect();
    Json(json!({ "object": "list", "data": data }))
}

async fn chat(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.push(&headers, body);
    Json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Alpha is a letter." } }]
    }))
}

/// Labels every item `index: 0`, as a misbehaving gateway might.
async fn repeated_index(Json(body): Json<Value>) -> Json<Value> {
    let count = body["input"].as_array().map_or(0, Vec::len);
    let data: Vec<Value> =
        (0..count).map(|i| json!({ "index": 0, "embedding": [i as f32] })).collect();
    Json(json!({ "object": "list", "data": data }))
}

async fn rejected() -> (StatusCode, Json<Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": { "message": "rate limit reached", "type": "requests" } })),
    )
}

async fn spawn_stub() -> (String, Recorded, tokio::task::JoinHandle<()>) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat))
        .route("/repeated/embeddings", post(repeated_index))
        .route("/limited/embeddings", post(rejected))
        .route("/limited/chat/completions", post(rejected))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server run");
    });
    (format!("http://{addr}"), recorded, handle)
}

#[tokio::test]
async fn embeddings_are_batched_and_returned_in_input_order() {
    let (base, recorded, handle) = spawn_stub().await;
    let config = OpenAIConfig::new("sk-test", "text-embedding-3-small")
        .with_base_url(format!("{base}/v1/"));
    let provider = OpenAIEmbeddingProvider::new(config).unwrap().with_batch_size(2);

    let embeddings = provider.embed_batch(&["a", "bb", "ccc"]).await.unwrap();
    assert_eq!(embeddings, vec![vec![0.0, 1.0], vec![1.0, 2.0], vec![0.0, 3.0]]);

    let requests = recorded.all();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0.as_deref(), Some("Bearer sk-test"));
    assert_eq!(requests[0].1["model"], "text-embedding-3-small");
    assert_eq!(requests[0].1["input"], json!(["a", "bb"]));
    assert_eq!(requests[1].1["input"], json!(["ccc"]));
    assert!(requests[0].1.get("dimensions").is_none());

    let single = provider.embed("dddd").await.unwrap();
    assert_eq!(single, vec![0.0, 4.0]);

    handle.abort();
}

#[tokio::test]
async fn requested_dimensions_are_forwarded() {
    let (base, recorded, handle) = spawn_stub().await;
    let config = OpenAIConfig::new("sk-test", "text-embedding-3-small")
        .with_base_url(format!("{base}/v1"));
    let provider = OpenAIEmbeddingProvider::new(config).unwrap().with_dimensions(2);

    provider.embed("x").await.unwrap();
    assert_eq!(recorded.all()[0].1["dimensions"], 2);

    handle.abort();
}

#[tokio::test]
async fn repeated_embedding_index_is_a_provider_error() {
    let (base, _recorded, handle) = spawn_stub().await;
    let config = OpenAIConfig::new("sk-test", "m").with_base_url(format!("{base}/repeated"));
    let provider = OpenAIEmbeddingProvider::new(config).unwrap();

    let err = provider.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, RagError::Provider { ref message, .. } if message.contains("0..2")));

    handle.abort();
}

#[tokio::test]
async fn chat_sends_prompt_and_generation_params() {
    let (base, recorded, handle) = spawn_stub().await;
    let model =
        OpenAIChatModel::new(OpenAIConfig::new("sk-test", "gpt-4o-mini").with_base_url(format!("{base}/v1")))
            .unwrap();

    let answer = model.generate("What is Alpha?", &GenerationParams::default()).await.unwrap();
    assert_eq!(answer, "Alpha is a letter.");

    let (auth, body) = recorded.all().remove(0);
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"], json!([{ "role": "user", "content": "What is Alpha?" }]));
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["stream"], false);
    assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);

    handle.abort();
}

#[tokio::test]
async fn error_status_maps_to_provider_error() {
    let (base, _recorded, handle) = spawn_stub().await;
    let config = OpenAIConfig::new("sk-test", "m").with_base_url(format!("{base}/limited"));

    let err = OpenAIEmbeddingProvider::new(config.clone()).unwrap().embed("x").await.unwrap_err();
    match err {
        RagError::Provider { message, .. } => {
            assert!(message.contains("429"), "{message}");
            assert!(message.contains("rate limit reached"), "{message}");
        }
        other => panic!("expected provider error, got {other:?}"),
    }

    let err = OpenAIChatModel::new(config)
        .unwrap()
        .generate("q", &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Provider { .. }));

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_provider_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = OpenAIConfig::new("sk-test", "m").with_base_url(format!("http://{addr}"));
    let err = OpenAIEmbeddingProvider::new(config).unwrap().embed("x").await.unwrap_err();
    assert!(matches!(err, RagError::Provider { .. }));
}
