//! The gateway context: provider profiles, the connection registry and the
//! supervised duplex tasks, owned together and passed explicitly.

use crate::{
    config::GatewayConfig, error::GatewayError, profiles::ProfileRegistry,
    request::PromptRequest,
};
use anyhow::Result;
use provider::Provider;
use relay::{ConnectionRegistry, ProgressMessenger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use uuid::Uuid;

/// Message returned when a duplex ask is accepted.
pub const ACCEPTED_MESSAGE: &str = "Processing started";

/// Acknowledgement for an accepted duplex ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accepted {
    /// Human-readable status.
    pub message: String,
    /// Caller the request was accepted for.
    pub caller_id: Uuid,
}

/// Gateway context shared by every request handler.
pub struct Gateway {
    profiles: ProfileRegistry,
    connections: Arc<ConnectionRegistry>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl Gateway {
    /// Build providers and the connection registry from config.
    pub fn new(config: &GatewayConfig, client: reqwest::Client) -> Result<Self> {
        let profiles = ProfileRegistry::from_config(config, client)?;
        let connections = Arc::new(ConnectionRegistry::new(config.relay.buffer()));
        tracing::info!(
            "gateway ready with providers [{}]",
            profiles.names().collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            profiles,
            connections,
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Provider profiles.
    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Live duplex connections and their buffers.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Number of duplex tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Answer `request` synchronously.
    pub async fn ask(&self, request: &PromptRequest) -> Result<String, GatewayError> {
        let provider = self.resolve(request)?;
        let answer = provider.ask(request.prompt()).await?;
        Ok(answer)
    }

    /// Start answering `request` in the background, streaming progress to
    /// `channel`. Resolution errors are returned immediately; everything
    /// after acceptance is reported on the channel.
    pub fn duplex_ask(
        &self,
        channel: &str,
        request: PromptRequest,
    ) -> Result<Accepted, GatewayError> {
        let provider = self.resolve(&request)?;
        let messenger = ProgressMessenger::new(channel, self.connections.clone());
        let cancel = self.cancel.child_token();
        let caller_id = request.caller_id();

        tracing::info!(
            "duplex ask for {caller_id} on {channel} via '{}'",
            provider.name()
        );
        self.tasks.spawn(async move {
            provider
                .ask_duplex(request.prompt(), &messenger, &cancel)
                .await;
        });

        Ok(Accepted {
            message: ACCEPTED_MESSAGE.to_owned(),
            caller_id,
        })
    }

    /// Cancel every in-flight duplex task and wait for them to finish.
    pub async fn shutdown(&self) {
        tracing::info!("cancelling {} duplex tasks", self.tasks.len());
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }

    fn resolve(&self, request: &PromptRequest) -> Result<Arc<Provider>, GatewayError> {
        self.profiles.register_caller(request.caller_id());
        self.profiles
            .resolve(request.caller_id(), request.purpose())
    }
}
