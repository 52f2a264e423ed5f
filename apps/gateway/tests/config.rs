//! Gateway configuration tests.

use promptgate_gateway::{GatewayConfig, Purpose, config::DEFAULT_CONFIG_FILE};
use std::path::Path;

const CONFIG: &str = r#"
[server]
port = 9000

[auth]
service_keys = ["svc-key"]

[routing]
default = "deepseek"

[routing.purposes]
checking_attribute = "giga"

[[providers]]
name = "deepseek"
provider = "deep_seek"
model = "deepseek/deepseek-chat"
endpoint = "https://openrouter.ai/api/v1/chat/completions"
temperature = 0.7
referer = "https://example.com"
site_name = "promptgate"

[providers.credential]
kind = "rotating_keys"
path = "keys/deepseek.json"

[[providers]]
name = "giga"
provider = "giga_chat"
model = "GigaChat"
endpoint = "https://gigachat.devices.sberbank.ru/api/v1/chat/completions"
temperature = 0.5
repetition_penalty = 1.0

[providers.credential]
kind = "oauth_refresh"
endpoint = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth"
authorization_key = "${PROMPTGATE_TEST_GIGA_KEY:-fallback-key}"
scope = "GIGACHAT_API_PERS"
store = "keys/gigachat.json"
"#;

#[test]
fn parse_full_config() {
    let config = GatewayConfig::from_toml(CONFIG).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert_eq!(config.auth.service_keys, ["svc-key"]);
    assert_eq!(config.relay.max_buffer_size, 50);
    assert_eq!(config.relay.message_ttl_secs, 3600);
    assert_eq!(config.providers.len(), 2);

    let routes = config.routing.routes().unwrap();
    assert_eq!(routes[&Purpose::CheckingAttribute], "giga");
    config.validate().unwrap();
}

#[test]
fn env_fallback_is_applied() {
    let config = GatewayConfig::from_toml(CONFIG).unwrap();
    match &config.providers[1].credential {
        credential::CredentialConfig::OauthRefresh(settings) => {
            assert_eq!(settings.authorization_key, "fallback-key")
        }
        other => panic!("unexpected credential {}", other.kind()),
    }
}

#[test]
fn unknown_default_route_rejected() {
    let config =
        GatewayConfig::from_toml(&CONFIG.replace("default = \"deepseek\"", "default = \"nope\""))
            .unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("routing.default"));
}

#[test]
fn unknown_purpose_route_rejected() {
    let config = GatewayConfig::from_toml(
        &CONFIG.replace("checking_attribute = \"giga\"", "summarize = \"giga\""),
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn duplicate_provider_names_rejected() {
    let renamed = CONFIG.replace("name = \"giga\"", "name = \"deepseek\"");
    let config = GatewayConfig::from_toml(&renamed).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn empty_config_needs_a_provider() {
    let config = GatewayConfig::from_toml("").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn load_resolves_store_paths_next_to_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    std::fs::write(&path, CONFIG).unwrap();

    let config = GatewayConfig::load(&path).unwrap();
    match &config.providers[0].credential {
        credential::CredentialConfig::RotatingKeys { path } => {
            assert_eq!(path, &dir.path().join("keys/deepseek.json"))
        }
        other => panic!("unexpected credential {}", other.kind()),
    }
}

#[test]
fn load_missing_file_fails() {
    assert!(GatewayConfig::load(Path::new("/nonexistent/promptgate.toml")).is_err());
}
