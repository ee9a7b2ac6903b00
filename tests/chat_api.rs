mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::{FakeEmbedder, RecordingCompleter};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wikiqa::server::{ChatResponse, ErrorBody};
use wikiqa::{Document, IngestOptions, IngestionPipeline, MemoryIndex, QueryOptions, QueryService};

async fn spawn_server(completer: Arc<RecordingCompleter>) -> SocketAddr {
    let embedder = Arc::new(FakeEmbedder::new());
    let index = Arc::new(MemoryIndex::new());
    IngestionPipeline::new(embedder.clone(), index.clone(), IngestOptions::default())
        .ingest_documents(&[Document::new(
            "Physics",
            "Physics is the study of matter, energy and their interactions.",
        )])
        .await
        .unwrap();
    let service = Arc::new(QueryService::new(
        embedder,
        index,
        completer,
        QueryOptions::default(),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(wikiqa::server::serve(listener, service));
    addr
}

#[tokio::test(flavor = "current_thread")]
async fn chat_replies_with_grounded_answer() {
    let completer = Arc::new(RecordingCompleter::replying("Physics studies matter and energy."));
    let addr = spawn_server(completer.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&json!({"message": "What does physics study?"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: ChatResponse = resp.json().await.unwrap();
    assert_eq!(body.reply, "Physics studies matter and energy.");
    assert!(completer
        .last_prompt()
        .unwrap()
        .contains("Physics is the study of matter, energy and their interactions."));
}

#[tokio::test(flavor = "current_thread")]
async fn malformed_and_blank_messages_are_bad_requests() {
    let completer = Arc::new(RecordingCompleter::replying("unused"));
    let addr = spawn_server(completer.clone()).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/chat");

    let missing_field = client.post(&url).json(&json!({"question": "hi"})).send().await.unwrap();
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing_field.json().await.unwrap();
    assert!(body["error"].is_string());

    let blank = client.post(&url).json(&json!({"message": "  "})).send().await.unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = blank.json().await.unwrap();
    assert!(body.error.contains("message must not be empty"));

    assert!(completer.prompts.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn provider_outage_becomes_bad_gateway() {
    let completer = Arc::new(RecordingCompleter::unavailable("completion backend down"));
    let addr = spawn_server(completer).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&json!({"message": "What is energy?"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorBody = resp.json().await.unwrap();
    assert!(body.error.contains("completion backend down"));
}

#[tokio::test(flavor = "current_thread")]
async fn healthz_is_ok() {
    let addr = spawn_server(Arc::new(RecordingCompleter::replying("unused"))).await;
    let resp = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
