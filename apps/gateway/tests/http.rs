//! End-to-end tests over HTTP and WebSocket.

use futures_util::StreamExt;
use httpmock::prelude::*;
use promptgate_gateway::{GatewayConfig, serve};
use relay::{Envelope, Status};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const CALLER: &str = "0190f3a4-5c2e-7d1b-8a9f-3b6c2d1e0f4a";

fn config(server: &MockServer) -> GatewayConfig {
    let toml = format!(
        r#"
[auth]
service_keys = ["svc-key"]

[routing]
default = "deepseek"

[[providers]]
name = "deepseek"
provider = "deep_seek"
model = "deepseek/deepseek-chat"
endpoint = "{endpoint}"
temperature = 0.7
timeout_secs = 5
referer = "https://example.com"
site_name = "promptgate"

[providers.credential]
kind = "static"
value = "deepseek-token"
"#,
        endpoint = server.url("/chat"),
    );
    GatewayConfig::from_toml(&toml).unwrap()
}

async fn mock_answer(server: &MockServer, answer: &str) {
    let answer = answer.to_owned();
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/chat");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": answer } }]
            }));
        })
        .await;
}

fn body(purpose: &str) -> Value {
    json!({ "caller_id": CALLER, "prompt": "describe the item", "purpose": purpose })
}

#[tokio::test]
async fn ask_returns_the_answer() {
    let server = MockServer::start_async().await;
    mock_answer(&server, "an answer").await;
    let handle = serve(&config(&server), "127.0.0.1:0").await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/api/v1/client/ask", handle.port))
        .bearer_auth("svc-key")
        .json(&body("attribute_generation"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply, json!({ "response": "an answer" }));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn ask_requires_a_service_key() {
    let server = MockServer::start_async().await;
    let handle = serve(&config(&server), "127.0.0.1:0").await.unwrap();
    let url = format!("http://127.0.0.1:{}/api/v1/client/ask", handle.port);
    let client = reqwest::Client::new();

    let missing = client
        .post(&url)
        .json(&body("attribute_generation"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 401);

    let wrong = client
        .post(&url)
        .bearer_auth("other-key")
        .json(&body("attribute_generation"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let server = MockServer::start_async().await;
    let handle = serve(&config(&server), "127.0.0.1:0").await.unwrap();
    let url = format!("http://127.0.0.1:{}/api/v1/client/ask", handle.port);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .bearer_auth("svc-key")
        .json(&body("summarize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let reply: Value = response.json().await.unwrap();
    assert!(reply["detail"].as_str().unwrap().contains("attribute_matcher"));

    let response = client
        .post(&url)
        .bearer_auth("svc-key")
        .json(&json!({ "caller_id": "nope", "prompt": "p", "purpose": "attribute_matcher" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply["detail"], "Invalid user uid");

    let response = client
        .post(&url)
        .bearer_auth("svc-key")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplex_ask_is_delivered_over_websocket() {
    let server = MockServer::start_async().await;
    mock_answer(&server, "over the wire").await;
    let handle = serve(&config(&server), "127.0.0.1:0").await.unwrap();

    let (mut socket, _) = connect_async(format!(
        "ws://127.0.0.1:{}/api/v1/ws/llm/session-1",
        handle.port
    ))
    .await
    .unwrap();

    // Let the socket register before the task starts sending.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = reqwest::Client::new()
        .post(format!(
            "http://127.0.0.1:{}/api/v1/client/ws_ask/session-1",
            handle.port
        ))
        .bearer_auth("svc-key")
        .json(&body("checking_attribute"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);
    let accepted: Value = response.json().await.unwrap();
    assert_eq!(accepted["message"], "Processing started");
    assert_eq!(accepted["caller_id"], CALLER);

    let mut envelopes = Vec::new();
    while let Some(message) = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for envelope")
    {
        let Message::Text(text) = message.unwrap() else {
            continue;
        };
        let envelope: Envelope = serde_json::from_str(text.as_str()).unwrap();
        let terminal = envelope.is_terminal();
        envelopes.push(envelope);
        if terminal {
            break;
        }
    }

    let last = envelopes.last().unwrap();
    assert_eq!(last.status, Status::Completed);
    assert_eq!(last.result, Some(json!({ "response": "over the wire" })));
    assert!(envelopes[..envelopes.len() - 1]
        .iter()
        .all(|e| e.status == Status::Processing));

    socket.close(None).await.unwrap();
    handle.shutdown().await.unwrap();
}
