//! Duplex ask tests: progress envelopes, terminal outcome, cancellation.

use credential::{CredentialConfig, StaticSettings};
use httpmock::prelude::*;
use promptgate_provider::{BackendConfig, ProviderConfig, build_provider, config::DeepSeekConfig};
use relay::{ConnectionRegistry, Envelope, ProgressMessenger, Status};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        name: "test".into(),
        model: "test-model".into(),
        endpoint: server.url("/v1/chat"),
        temperature: Some(0.5),
        timeout_secs: 5,
        backend: BackendConfig::DeepSeek(DeepSeekConfig {
            referer: "https://example.com".to_owned(),
            site_name: "promptgate".to_owned(),
        }),
        credential: CredentialConfig::Static(StaticSettings {
            value: Some("secret-token".to_owned()),
            env: None,
        }),
    }
}

fn listen(channel: &str) -> (ProgressMessenger, mpsc::UnboundedReceiver<Envelope>) {
    let registry = Arc::new(ConnectionRegistry::default());
    let (tx, rx) = mpsc::unbounded_channel();
    registry.connect(channel, tx);
    (ProgressMessenger::new(channel, registry), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        out.push(envelope);
    }
    out
}

#[tokio::test]
async fn duplex_reports_progress_then_success() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": "answer" } }]
            }));
        })
        .await;

    let provider = build_provider(&config(&server), reqwest::Client::new()).unwrap();
    let (messenger, mut rx) = listen("chat");
    let pending = messenger.pending_result();
    provider
        .ask_duplex("hello", &messenger, &CancellationToken::new())
        .await;

    let envelopes = drain(&mut rx);
    let progress: Vec<_> = envelopes.iter().filter_map(|e| e.progress).collect();
    assert_eq!(progress, [10, 30, 40, 50]);

    let last = envelopes.last().unwrap();
    assert_eq!(last.status, Status::Completed);
    assert_eq!(last.result, Some(json!({ "response": "answer" })));
    assert_eq!(envelopes.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(pending.await.unwrap().unwrap(), json!({ "response": "answer" }));
}

#[tokio::test]
async fn duplex_backend_failure_emits_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat");
            then.status(500).body("boom");
        })
        .await;

    let provider = build_provider(&config(&server), reqwest::Client::new()).unwrap();
    let (messenger, mut rx) = listen("chat");
    provider
        .ask_duplex("hello", &messenger, &CancellationToken::new())
        .await;

    let last = drain(&mut rx).pop().unwrap();
    assert_eq!(last.status, Status::Error);
    assert!(last.message.contains("500"));
    assert_eq!(last.stage.as_deref(), Some("failed"));
}

#[tokio::test]
async fn duplex_cancellation_is_terminal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat");
            then.status(200)
                .delay(Duration::from_secs(10))
                .json_body(json!({ "choices": [{ "message": { "content": "late" } }] }));
        })
        .await;

    let provider = build_provider(&config(&server), reqwest::Client::new()).unwrap();
    let (messenger, mut rx) = listen("chat");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    provider.ask_duplex("hello", &messenger, &cancel).await;

    let envelopes = drain(&mut rx);
    let last = envelopes.last().unwrap();
    assert_eq!(last.status, Status::Error);
    assert_eq!(last.message, "request cancelled");
    assert_eq!(envelopes.iter().filter(|e| e.is_terminal()).count(), 1);
}
