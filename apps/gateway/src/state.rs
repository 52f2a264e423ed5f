//! Shared application state for the gateway server.

use crate::{auth::Authenticator, gateway::Gateway};
use std::sync::Arc;

/// Shared state available to all request handlers.
pub struct AppState<A: Authenticator> {
    /// Gateway context (providers, connections, duplex tasks).
    pub gateway: Arc<Gateway>,
    /// Authenticator for the HTTP ask routes.
    pub authenticator: Arc<A>,
}

impl<A: Authenticator> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}
