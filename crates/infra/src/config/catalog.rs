//! Named endpoints plus the connection settings they share

use std::collections::HashSet;

use polycall_domain::{ConnectionConfig, Endpoint, PolycallError, Result};
use serde::{Deserialize, Serialize};

/// Contents of a catalog file.
///
/// ```toml
/// [connection]
/// insecure_skip_verify = false
/// ca_cert_path = "/etc/polycall/ca.pem"
///
/// [[endpoints]]
/// friendly_name = "users"
/// url = "https://api.example.com/users"
/// type = "rest"
/// timeout_ms = 5000
/// max_retries = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCatalog {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl EndpointCatalog {
    /// Look up an endpoint by its friendly name.
    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| endpoint.friendly_name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|endpoint| endpoint.friendly_name.as_str())
    }

    /// # Errors
    /// Returns `PolycallError::Validation` for an invalid endpoint or a
    /// friendly name used twice.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            endpoint.validate()?;
            if !seen.insert(endpoint.friendly_name.as_str()) {
                return Err(PolycallError::Validation(format!(
                    "duplicate endpoint name: {}",
                    endpoint.friendly_name
                )));
            }
        }
        Ok(())
    }
}
