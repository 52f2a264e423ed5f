//! Provider crate: backend clients behind a uniform `ask` contract.
//!
//! `Provider` wraps a concrete backend (DeepSeek, GigaChat, Yandex) together
//! with its credential source. `ask` returns the reply text; `ask_duplex`
//! reports progress and the outcome through a [`relay::ProgressMessenger`].
//! Config uses the `BackendConfig` tagged enum so every backend is described
//! by a single `[[providers]]` table.

pub mod config;
pub mod deepseek;
mod error;
pub mod gigachat;
mod http;
mod provider;
pub mod yandex;

pub use {
    config::{BackendConfig, ProviderConfig},
    error::{ProviderError, Result},
    http::HttpTransport,
    provider::{Backend, Provider, build_provider},
};
