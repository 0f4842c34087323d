//! Protocol client construction and the process-wide orchestrator

use std::sync::Arc;

use once_cell::sync::Lazy;
use polycall_core::{CallOrchestrator, ClientFactory, ProtocolClient};
use polycall_domain::{
    CallError, CallParams, CallResult, ConnectionConfig, Endpoint, Protocol, Result,
};
use tracing::debug;

use crate::grpc::GrpcClient;
use crate::rest::RestClient;
use crate::soap::SoapClient;

/// Builds the network-backed driver matching each endpoint's protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClientFactory;

impl ClientFactory for DefaultClientFactory {
    fn create(
        &self,
        endpoint: &Endpoint,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn ProtocolClient>> {
        debug!(
            endpoint = %endpoint.friendly_name,
            protocol = %endpoint.protocol,
            "building protocol client"
        );
        let client: Arc<dyn ProtocolClient> = match endpoint.protocol {
            Protocol::Rest | Protocol::FormUrlEncoded => {
                Arc::new(RestClient::new(endpoint, config)?)
            }
            Protocol::Soap => Arc::new(SoapClient::new(endpoint, config)?),
            Protocol::Grpc => Arc::new(GrpcClient::new(endpoint, config)?),
        };
        Ok(client)
    }
}

static DEFAULT_ORCHESTRATOR: Lazy<CallOrchestrator> =
    Lazy::new(|| CallOrchestrator::new(Arc::new(DefaultClientFactory)));

/// Shared orchestrator whose client cache lives for the whole process.
pub fn default_orchestrator() -> &'static CallOrchestrator {
    &DEFAULT_ORCHESTRATOR
}

/// Call an endpoint through [`default_orchestrator`].
///
/// # Errors
/// See [`CallOrchestrator::call`].
pub async fn call_endpoint(
    endpoint: &Endpoint,
    params: Option<CallParams>,
    config: Option<&ConnectionConfig>,
) -> std::result::Result<CallResult, CallError> {
    default_orchestrator().call(endpoint, params, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_matches_protocols() {
        let factory = DefaultClientFactory;
        let config = ConnectionConfig::insecure();
        let endpoints = [
            Endpoint::rest("Rest", "https://api.example.com/users"),
            Endpoint::new("Form", "https://api.example.com/login", Protocol::FormUrlEncoded),
            Endpoint::soap("Soap", "https://www.w3schools.com/xml/tempconvert.asmx"),
            Endpoint::grpc("Grpc", "localhost:50051"),
        ];

        for endpoint in endpoints {
            let client = factory.create(&endpoint, &config).unwrap();
            assert_eq!(client.protocol(), endpoint.protocol);
        }
    }

    #[test]
    fn default_orchestrator_is_a_singleton() {
        assert!(std::ptr::eq(default_orchestrator(), default_orchestrator()));
        assert!(Arc::ptr_eq(default_orchestrator().cache(), default_orchestrator().cache()));
    }
}
