//! OAuth refresh tests against a mock token endpoint.

use promptgate_credential::{
    CredentialError, OAuthRefresh, OAuthSettings,
    oauth::{REFRESH_MARGIN_MS, TokenRecord},
};
use httpmock::prelude::*;
use indexmap::IndexMap;
use serde_json::json;
use std::path::Path;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn settings(server: &MockServer, store: &Path) -> OAuthSettings {
    OAuthSettings {
        endpoint: server.url("/api/v2/oauth"),
        authorization_key: "c2VjcmV0".to_owned(),
        scope: "GIGACHAT_API_PERS".to_owned(),
        store: store.to_path_buf(),
        timeout_secs: 5,
    }
}

fn seed(store: &Path, token: &str, expires_at: i64) {
    let table = IndexMap::from([(
        token.to_owned(),
        TokenRecord {
            rq_uid: "seed".to_owned(),
            expires_at,
            created_at: 0,
        },
    )]);
    std::fs::write(store, serde_json::to_string(&table).unwrap()).unwrap();
}

#[tokio::test]
async fn valid_token_is_reused() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/oauth");
            then.status(200);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("token.json");
    seed(&store, "cached", now_ms() + 10 * 60 * 1000);

    let provider = OAuthRefresh::open(reqwest::Client::new(), settings(&server, &store)).unwrap();
    assert_eq!(provider.credential().await.unwrap(), "cached");
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn token_inside_margin_is_refreshed() {
    let server = MockServer::start_async().await;
    let expires_at = now_ms() + 30 * 60 * 1000;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2/oauth")
                .header("authorization", "Basic c2VjcmV0")
                .header_exists("RqUID")
                .body_includes("scope=GIGACHAT_API_PERS");
            then.status(200)
                .json_body(json!({ "access_token": "fresh", "expires_at": expires_at }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("token.json");
    seed(&store, "stale", now_ms() + REFRESH_MARGIN_MS - 1000);

    let provider = OAuthRefresh::open(reqwest::Client::new(), settings(&server, &store)).unwrap();
    assert_eq!(provider.credential().await.unwrap(), "fresh");
    mock.assert_async().await;

    // Store replaced wholesale.
    let persisted: IndexMap<String, TokenRecord> =
        serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted["fresh"].expires_at, expires_at);
    assert!(!persisted["fresh"].rq_uid.is_empty());

    // Second call reuses the fresh token.
    assert_eq!(provider.credential().await.unwrap(), "fresh");
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn missing_store_triggers_refresh() {
    let server = MockServer::start_async().await;
    let expires_at = now_ms() + 30 * 60 * 1000;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/oauth");
            then.status(200)
                .json_body(json!({ "access_token": "first", "expires_at": expires_at }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("token.json");
    let provider = OAuthRefresh::open(reqwest::Client::new(), settings(&server, &store)).unwrap();
    assert_eq!(provider.credential().await.unwrap(), "first");
    assert!(store.exists());
}

#[tokio::test]
async fn failed_refresh_leaves_store_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/oauth");
            then.status(401).body("bad credentials");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("token.json");
    seed(&store, "expired", now_ms() - 1000);
    let before = std::fs::read_to_string(&store).unwrap();

    let provider = OAuthRefresh::open(reqwest::Client::new(), settings(&server, &store)).unwrap();
    let err = provider.credential().await.unwrap_err();
    assert!(matches!(err, CredentialError::Refresh(ref msg) if msg.contains("401")));
    assert_eq!(std::fs::read_to_string(&store).unwrap(), before);
    assert_eq!(provider.current().await.unwrap().0, "expired");
}

#[tokio::test]
async fn reply_without_token_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/oauth");
            then.status(200).json_body(json!({ "expires_at": 1 }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("token.json");
    let provider = OAuthRefresh::open(reqwest::Client::new(), settings(&server, &store)).unwrap();
    assert!(matches!(
        provider.credential().await,
        Err(CredentialError::Refresh(_))
    ));
    assert!(!store.exists());
}
