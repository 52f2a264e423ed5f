//! Serve entrypoint shared by the binary and the integration tests.

use crate::{
    GatewayConfig, ServiceKeyAuthenticator, gateway::Gateway, routes, state::AppState,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Handle returned by [`serve`]: the bound port and a shutdown trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    /// The gateway context being served.
    pub gateway: Arc<Gateway>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<tokio::task::JoinHandle<Result<(), std::io::Error>>>,
}

impl ServeHandle {
    /// Stop accepting requests, cancel in-flight duplex tasks and wait for
    /// the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.gateway.shutdown().await;
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Build the gateway from `config`, bind the axum server and start serving.
///
/// The server runs in a spawned task; call [`ServeHandle::shutdown`] to stop
/// it.
pub async fn serve(config: &GatewayConfig, bind: &str) -> Result<ServeHandle> {
    let gateway = Arc::new(Gateway::new(config, reqwest::Client::new())?);
    let authenticator = ServiceKeyAuthenticator::from_config(&config.auth);
    if !authenticator.enabled() {
        tracing::warn!("no service keys configured, ask routes are unauthenticated");
    }

    let state = AppState {
        gateway: gateway.clone(),
        authenticator: Arc::new(authenticator),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {bind} (port {port})");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        gateway,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}
