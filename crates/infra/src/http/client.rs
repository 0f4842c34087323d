use std::collections::BTreeMap;
use std::time::Duration;

use polycall_domain::{ConnectionConfig, HeaderMultimap, PolycallError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Client as ReqwestClient, Identity};
use tracing::debug;

use crate::errors::InfraError;
use crate::tls::TlsMaterial;

/// Builder for the reqwest client shared by the REST and SOAP drivers.
///
/// No client-wide timeout is set: every attempt carries its own deadline.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    accept_invalid_certs: bool,
    tls: TlsMaterial,
}

impl HttpClientBuilder {
    /// Start from a connection config, loading its TLS material.
    ///
    /// # Errors
    /// Returns `PolycallError::ClientInit` when TLS material cannot be loaded.
    pub fn from_connection(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self {
            accept_invalid_certs: config.insecure_skip_verify,
            tls: TlsMaterial::load(config)?,
            ..Self::default()
        })
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns `PolycallError::ClientInit` when reqwest rejects the TLS
    /// material or cannot initialise its backend.
    pub fn build(self) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        for der in &self.tls.ca_der {
            let cert = Certificate::from_der(der).map_err(|err| {
                PolycallError::ClientInit(format!("failed to parse CA certificate: {err}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(identity) = &self.tls.identity {
            let identity = Identity::from_pem(&identity.combined_pem()).map_err(|err| {
                PolycallError::ClientInit(format!("failed to load client certificate: {err}"))
            })?;
            builder = builder.identity(identity);
        }

        debug!(
            insecure = self.accept_invalid_certs,
            custom_roots = self.tls.ca_der.len(),
            client_identity = self.tls.identity.is_some(),
            "building HTTP client"
        );

        builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            match PolycallError::from(infra) {
                PolycallError::ClientInit(msg) => PolycallError::ClientInit(msg),
                other => PolycallError::ClientInit(other.to_string()),
            }
        })
    }
}

/// Convert caller headers into a reqwest header map.
///
/// # Errors
/// Returns `PolycallError::Validation` for names or values HTTP cannot carry.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| PolycallError::Validation(format!("invalid header name: {name}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PolycallError::Validation(format!("invalid value for header {name}"))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Response headers as a name → values multimap. Values that are not valid
/// UTF-8 are converted lossily.
pub fn header_multimap(headers: &HeaderMap) -> HeaderMultimap {
    let mut multimap = HeaderMultimap::new();
    for (name, value) in headers {
        multimap
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    multimap
}
