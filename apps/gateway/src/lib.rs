//! Promptgate gateway: routes a caller's prompt to the configured backend,
//! either answering synchronously or streaming progress and the result to
//! the caller's duplex channel.

pub mod auth;
pub mod config;
mod error;
pub mod gateway;
pub mod profiles;
pub mod request;
mod routes;
pub mod serve;
pub mod state;
pub mod utils;
mod ws;

pub use {
    auth::{AuthContext, AuthError, Authenticator, ServiceKeyAuthenticator},
    config::GatewayConfig,
    error::GatewayError,
    gateway::{Accepted, Gateway},
    request::{AskPayload, PromptRequest, Purpose, RequestError},
    routes::{AskResponse, router},
    serve::{ServeHandle, serve},
    state::AppState,
};
