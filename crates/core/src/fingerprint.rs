//! Stable cache key for (endpoint, connection config) pairs

use std::fmt;
use std::path::Path;

use polycall_domain::{ConnectionConfig, Endpoint};
use sha2::{Digest, Sha256};

/// SHA-256 (hex) over the endpoint identity and the connection settings.
///
/// Hashes the friendly name, URL, protocol, skip-verify flag and the three
/// credential paths. File contents are not read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(endpoint: &Endpoint, config: &ConnectionConfig) -> Self {
        let key = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            endpoint.friendly_name,
            endpoint.url,
            endpoint.protocol,
            config.insecure_skip_verify,
            path_component(config.tls_cert_path.as_deref()),
            path_component(config.tls_key_path.as_deref()),
            path_component(config.ca_cert_path.as_deref()),
        );
        Self(hex::encode(Sha256::digest(key.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn path_component(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
}
