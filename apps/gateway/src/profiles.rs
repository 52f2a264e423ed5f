//! Provider profiles resolved per caller and purpose.
//!
//! Providers are built once at startup, each owning its credential store.
//! Resolution applies the routing policy (explicit purpose route, else the
//! default) and caches the result per (caller, purpose).

use crate::{config::GatewayConfig, error::GatewayError, request::Purpose};
use anyhow::{Context, Result};
use compact_str::CompactString;
use parking_lot::Mutex;
use provider::{Provider, build_provider};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use uuid::Uuid;

/// Named providers plus the routing policy and per-caller cache.
pub struct ProfileRegistry {
    providers: BTreeMap<CompactString, Arc<Provider>>,
    default: CompactString,
    routes: BTreeMap<Purpose, CompactString>,
    callers: Mutex<BTreeSet<Uuid>>,
    cache: Mutex<BTreeMap<(Uuid, Purpose), Arc<Provider>>>,
}

impl ProfileRegistry {
    /// Build every configured provider.
    pub fn from_config(config: &GatewayConfig, client: reqwest::Client) -> Result<Self> {
        let mut providers = BTreeMap::new();
        for provider_config in &config.providers {
            let provider = build_provider(provider_config, client.clone())
                .with_context(|| format!("failed to build provider '{}'", provider_config.name))?;
            providers.insert(provider_config.name.clone(), Arc::new(provider));
        }

        Ok(Self {
            providers,
            default: config.routing.default.clone(),
            routes: config.routing.routes()?,
            callers: Mutex::new(BTreeSet::new()),
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    /// Record a caller as known.
    pub fn register_caller(&self, caller: Uuid) {
        if self.callers.lock().insert(caller) {
            tracing::debug!("registered caller {caller}");
        }
    }

    /// Number of callers seen so far.
    pub fn caller_count(&self) -> usize {
        self.callers.lock().len()
    }

    /// Name of the provider routed for `purpose`.
    pub fn route(&self, purpose: Purpose) -> &str {
        self.routes.get(&purpose).unwrap_or(&self.default)
    }

    /// Resolve the provider for (caller, purpose), caching the result.
    pub fn resolve(&self, caller: Uuid, purpose: Purpose) -> Result<Arc<Provider>, GatewayError> {
        let mut cache = self.cache.lock();
        if let Some(provider) = cache.get(&(caller, purpose)) {
            return Ok(provider.clone());
        }

        let name = self.route(purpose);
        let provider = self
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::Routing(format!("{purpose} routes to unknown '{name}'")))?;
        tracing::debug!("caller {caller} uses '{name}' for {purpose}");
        cache.insert((caller, purpose), provider.clone());
        Ok(provider)
    }

    /// Configured provider names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(CompactString::as_str)
    }
}
