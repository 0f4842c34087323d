//! Port interfaces implemented by the infrastructure layer

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polycall_domain::{CallRequest, ConnectionConfig, Endpoint, Protocol, ProtocolResponse, Result};

/// One protocol driver bound to a single endpoint.
///
/// Implementations must be safe to call concurrently; the cache hands the same
/// instance to every caller with a matching fingerprint.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Perform one attempt.
    ///
    /// `Ok` means a response was received, even if the response itself reports
    /// failure through `ProtocolResponse::error`. `Err` means nothing usable
    /// came back (encoding failure, transport failure, deadline).
    async fn call(&self, request: CallRequest) -> Result<ProtocolResponse>;

    /// Called once when the client is evicted. The bundled drivers only hold
    /// reference-counted reqwest and tonic handles, so they keep this default
    /// and their connections go away when the last `Arc` is dropped.
    fn close(&self) {}
}

/// Builds protocol clients for endpoints that are not cached yet.
pub trait ClientFactory: Send + Sync {
    /// # Errors
    /// Returns `PolycallError::ClientInit` when TLS material or the transport
    /// cannot be set up, `PolycallError::Validation` for unusable endpoints.
    fn create(
        &self,
        endpoint: &Endpoint,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn ProtocolClient>>;
}

/// Waits between retry attempts. Injected so tests can observe backoff
/// without sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
