//! Loading and validating PEM material referenced by a `ConnectionConfig`

use std::fs;
use std::io::BufReader;
use std::path::Path;

use polycall_domain::{ConnectionConfig, PolycallError, Result};
use tracing::debug;

/// Client certificate chain and private key, kept as PEM.
#[derive(Clone)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl ClientIdentity {
    /// Key followed by the certificate chain, the layout reqwest's rustls
    /// identity expects.
    pub fn combined_pem(&self) -> Vec<u8> {
        let mut pem = Vec::with_capacity(self.key_pem.len() + self.cert_pem.len() + 1);
        pem.extend_from_slice(&self.key_pem);
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.cert_pem);
        pem
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem_len", &self.cert_pem.len())
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Validated TLS material for one client.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    /// Raw CA bundle.
    pub ca_pem: Option<Vec<u8>>,
    /// Each certificate of the CA bundle in DER form.
    pub ca_der: Vec<Vec<u8>>,
    pub identity: Option<ClientIdentity>,
}

impl TlsMaterial {
    /// Read every configured credential file and check it parses.
    ///
    /// A client certificate without its key (or the reverse) is ignored.
    ///
    /// # Errors
    /// Returns `PolycallError::ClientInit` when a file cannot be read, holds
    /// no certificate, or the key file holds no private key.
    pub fn load(config: &ConnectionConfig) -> Result<Self> {
        let mut material = Self::default();

        if let Some(path) = config.ca_cert_path.as_deref() {
            let pem = read_pem(path, "CA certificate")?;
            material.ca_der = parse_certs(&pem, path, "CA certificate")?;
            material.ca_pem = Some(pem);
            debug!(path = %path.display(), certs = material.ca_der.len(), "loaded CA bundle");
        }

        if let Some((cert_path, key_path)) = config.client_identity_paths() {
            let cert_pem = read_pem(cert_path, "client certificate")?;
            parse_certs(&cert_pem, cert_path, "client certificate")?;
            let key_pem = read_pem(key_path, "client key")?;
            check_private_key(&key_pem, key_path)?;
            material.identity = Some(ClientIdentity { cert_pem, key_pem });
            debug!(cert = %cert_path.display(), "loaded client identity");
        }

        Ok(material)
    }

    pub fn is_empty(&self) -> bool {
        self.ca_pem.is_none() && self.identity.is_none()
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| {
        PolycallError::ClientInit(format!("failed to read {what} {}: {err}", path.display()))
    })
}

fn parse_certs(pem: &[u8], path: &Path, what: &str) -> Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.to_vec()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|err| {
            PolycallError::ClientInit(format!("failed to parse {what} {}: {err}", path.display()))
        })?;

    if certs.is_empty() {
        return Err(PolycallError::ClientInit(format!(
            "failed to parse {what} {}: no PEM certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

fn check_private_key(pem: &[u8], path: &Path) -> Result<()> {
    let mut reader = BufReader::new(pem);
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(PolycallError::ClientInit(format!(
            "failed to load client key {}: no private key found",
            path.display()
        ))),
        Err(err) => Err(PolycallError::ClientInit(format!(
            "failed to load client key {}: {err}",
            path.display()
        ))),
    }
}
