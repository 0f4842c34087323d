use async_trait::async_trait;
use polycall_core::ProtocolClient;
use polycall_domain::constants::{GRPC_CONNECT_TIMEOUT, GRPC_STATUS_ERROR, GRPC_STATUS_OK};
use polycall_domain::{
    CallRequest, ConnectionConfig, Endpoint, PolycallError, Protocol, ProtocolResponse,
    ResponseBody, Result,
};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{
    Certificate, Channel, ClientTlsConfig, Endpoint as ChannelEndpoint, Identity,
};
use tracing::{debug, instrument};

use super::codec::DynamicCodec;
use super::convert::{message_to_map, request_message};
use super::method::MethodPath;
use super::reflection::resolve_method;
use crate::errors::InfraError;
use crate::http::header_multimap;
use crate::tls::TlsMaterial;

/// Driver for `grpc` endpoints.
///
/// The channel connects lazily, so construction never waits on the network.
/// Method descriptors are looked up through server reflection on every call.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    endpoint: Endpoint,
    channel: Channel,
}

impl GrpcClient {
    /// Must be called inside a tokio runtime.
    ///
    /// `insecure_skip_verify` selects a plaintext channel. Otherwise an
    /// `https` URI is dialed with TLS using the web PKI roots plus any
    /// configured CA and client identity.
    ///
    /// # Errors
    /// `ClientInit` for an unusable URI or TLS material.
    pub fn new(endpoint: &Endpoint, config: &ConnectionConfig) -> Result<Self> {
        let uri = channel_uri(&endpoint.url, config.insecure_skip_verify);
        let mut channel_endpoint = ChannelEndpoint::from_shared(uri.clone())
            .map_err(|err| {
                PolycallError::ClientInit(format!("failed to connect to gRPC server {uri}: {err}"))
            })?
            .connect_timeout(GRPC_CONNECT_TIMEOUT);

        if !config.insecure_skip_verify && uri.starts_with("https://") {
            let tls = tls_config(&TlsMaterial::load(config)?);
            channel_endpoint = channel_endpoint.tls_config(tls).map_err(|err| {
                PolycallError::ClientInit(format!("failed to configure gRPC TLS: {err}"))
            })?;
        }

        debug!(endpoint = %endpoint.friendly_name, %uri, "gRPC channel configured");
        Ok(Self { endpoint: endpoint.clone(), channel: channel_endpoint.connect_lazy() })
    }
}

#[async_trait]
impl ProtocolClient for GrpcClient {
    fn protocol(&self) -> Protocol {
        Protocol::Grpc
    }

    #[instrument(
        skip_all,
        fields(endpoint = %self.endpoint.friendly_name, method = %request.method)
    )]
    async fn call(&self, request: CallRequest) -> Result<ProtocolResponse> {
        let method_path = MethodPath::parse(&request.method)?;
        let path = PathAndQuery::try_from(method_path.path()).map_err(|err| {
            PolycallError::Validation(format!(
                "invalid method name format: {}: {err}",
                request.method
            ))
        })?;

        let method = resolve_method(self.channel.clone(), &method_path).await?;
        if method.is_client_streaming() || method.is_server_streaming() {
            return Err(PolycallError::Validation(format!(
                "streaming gRPC methods are not supported: {}",
                request.method
            )));
        }
        let message = request_message(&method.input(), &request.body)?;

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|err| PolycallError::from(InfraError::from(err)))?;

        let mut outgoing = tonic::Request::new(message);
        if let Some(deadline) = request.deadline {
            outgoing.set_timeout(deadline);
        }

        match grpc.unary(outgoing, path, DynamicCodec::new(method.output())).await {
            Ok(response) => {
                let headers = header_multimap(&response.metadata().clone().into_headers());
                let body = message_to_map(response.get_ref())?;
                debug!("gRPC call succeeded");
                Ok(ProtocolResponse {
                    status_code: GRPC_STATUS_OK,
                    headers,
                    body: ResponseBody::Grpc(body),
                    error: None,
                })
            }
            Err(status) => {
                debug!(code = ?status.code(), "gRPC call failed");
                let headers = header_multimap(&status.metadata().clone().into_headers());
                Ok(ProtocolResponse {
                    status_code: GRPC_STATUS_ERROR,
                    headers,
                    body: ResponseBody::Empty,
                    error: Some(InfraError::from(status).into()),
                })
            }
        }
    }
}

/// Add a scheme when the URL has none: plaintext when skipping verification,
/// TLS otherwise.
fn channel_uri(url: &str, insecure: bool) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else if insecure {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}

fn tls_config(material: &TlsMaterial) -> ClientTlsConfig {
    let mut tls = ClientTlsConfig::new().with_webpki_roots();
    if let Some(ca) = &material.ca_pem {
        tls = tls.ca_certificate(Certificate::from_pem(ca));
    }
    if let Some(identity) = &material.identity {
        tls = tls.identity(Identity::from_pem(&identity.cert_pem, &identity.key_pem));
    }
    tls
}
