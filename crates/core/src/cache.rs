//! Registry of reusable protocol clients
//!
//! Clients are built lazily, once per [`Fingerprint`]. Lookups take a read
//! lock; a miss re-checks under the write lock and constructs the client while
//! holding it, so concurrent first calls for the same fingerprint build exactly
//! one client. Calls through a cached client never hold the registry lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use polycall_domain::{
    CallRequest, ConnectionConfig, Endpoint, PolycallError, ProtocolResponse, Result,
};
use tracing::{debug, info};

use crate::fingerprint::Fingerprint;
use crate::ports::{ClientFactory, ProtocolClient};

/// A constructed protocol client and the identity it was built for
pub struct CachedClient {
    fingerprint: Fingerprint,
    endpoint: Endpoint,
    client: Arc<dyn ProtocolClient>,
    closed: AtomicBool,
}

impl CachedClient {
    fn new(fingerprint: Fingerprint, endpoint: Endpoint, client: Arc<dyn ProtocolClient>) -> Self {
        Self { fingerprint, endpoint, client, closed: AtomicBool::new(false) }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Endpoint the client was first built for.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Run one attempt through the underlying client.
    ///
    /// # Errors
    /// Returns `PolycallError::ClientInit` once the client has been evicted,
    /// otherwise whatever the protocol client reports.
    pub async fn call(&self, request: CallRequest) -> Result<ProtocolResponse> {
        if self.is_closed() {
            return Err(PolycallError::ClientInit(format!(
                "client for endpoint '{}' was evicted",
                self.endpoint.friendly_name
            )));
        }
        self.client.call(request).await
    }

    // Attempts already running keep their own handle and finish normally.
    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.client.close();
        }
    }
}

impl std::fmt::Debug for CachedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient")
            .field("fingerprint", &self.fingerprint)
            .field("endpoint", &self.endpoint.friendly_name)
            .field("protocol", &self.client.protocol())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Concurrency-safe fingerprint → client registry
#[derive(Default)]
pub struct CallerCache {
    entries: RwLock<HashMap<Fingerprint, Arc<CachedClient>>>,
}

impl CallerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client for this endpoint/config, building it with
    /// `factory` on first use.
    ///
    /// # Errors
    /// Validation errors from the factory pass through; any other factory
    /// failure is reported as `PolycallError::ClientInit`. Nothing is cached
    /// on failure.
    pub fn get_or_create(
        &self,
        endpoint: &Endpoint,
        config: &ConnectionConfig,
        factory: &dyn ClientFactory,
    ) -> Result<Arc<CachedClient>> {
        let fingerprint = Fingerprint::of(endpoint, config);

        if let Some(cached) = self.entries.read().get(&fingerprint) {
            return Ok(Arc::clone(cached));
        }

        let mut entries = self.entries.write();
        if let Some(cached) = entries.get(&fingerprint) {
            debug!(endpoint = %endpoint.friendly_name, "client built by a concurrent caller");
            return Ok(Arc::clone(cached));
        }

        let client = factory.create(endpoint, config).map_err(|err| match err {
            PolycallError::Validation(_) | PolycallError::ClientInit(_) => err,
            other => PolycallError::ClientInit(format!(
                "failed to create client for endpoint '{}': {other}",
                endpoint.friendly_name
            )),
        })?;

        let cached = Arc::new(CachedClient::new(fingerprint.clone(), endpoint.clone(), client));
        entries.insert(fingerprint, Arc::clone(&cached));
        info!(
            endpoint = %endpoint.friendly_name,
            protocol = %endpoint.protocol,
            cached_clients = entries.len(),
            "protocol client created"
        );

        Ok(cached)
    }

    /// Look up without creating.
    pub fn get(&self, endpoint: &Endpoint, config: &ConnectionConfig) -> Option<Arc<CachedClient>> {
        self.entries.read().get(&Fingerprint::of(endpoint, config)).cloned()
    }

    pub fn contains(&self, endpoint: &Endpoint, config: &ConnectionConfig) -> bool {
        self.entries.read().contains_key(&Fingerprint::of(endpoint, config))
    }

    /// Evict and close one client. Returns whether an entry existed.
    pub fn remove(&self, endpoint: &Endpoint, config: &ConnectionConfig) -> bool {
        let fingerprint = Fingerprint::of(endpoint, config);
        let removed = self.entries.write().remove(&fingerprint);
        match removed {
            Some(cached) => {
                cached.close();
                info!(endpoint = %endpoint.friendly_name, "protocol client evicted");
                true
            }
            None => false,
        }
    }

    /// Evict and close every client. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = {
            let mut entries = self.entries.write();
            entries.drain().map(|(_, cached)| cached).collect()
        };
        for cached in &drained {
            cached.close();
        }
        if !drained.is_empty() {
            info!(evicted = drained.len(), "client cache cleared");
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for CallerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerCache").field("len", &self.len()).finish()
    }
}
