//! Transport security settings for a cached client

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// TLS configuration applied when a protocol client is built.
///
/// Credentials are referenced by path. Only the paths take part in the client
/// cache fingerprint, so rotating a certificate in place is not visible to the
/// cache until the client is evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Skip server certificate verification. For gRPC this selects a
    /// plaintext channel.
    pub insecure_skip_verify: bool,
    /// PEM client certificate; used together with `tls_key_path`.
    pub tls_cert_path: Option<PathBuf>,
    /// PEM private key for the client certificate.
    pub tls_key_path: Option<PathBuf>,
    /// PEM bundle of additional trusted roots.
    pub ca_cert_path: Option<PathBuf>,
}

impl ConnectionConfig {
    pub fn insecure() -> Self {
        Self { insecure_skip_verify: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_client_identity(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.tls_cert_path = Some(cert_path.into());
        self.tls_key_path = Some(key_path.into());
        self
    }

    #[must_use]
    pub fn with_ca_cert(mut self, ca_cert_path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(ca_cert_path.into());
        self
    }

    /// Client certificate and key, only when both are configured.
    pub fn client_identity_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// Whether any custom TLS material is configured.
    pub fn has_tls_material(&self) -> bool {
        self.ca_cert_path.is_some() || self.client_identity_paths().is_some()
    }
}
