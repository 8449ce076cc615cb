//! Secure-channel configuration for `wss://` endpoints.

use super::error::Result;
use log::debug;
use native_tls::{Certificate, Identity, TlsConnector};
use std::path::PathBuf;

/// Certificate material used to build the TLS connector.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// PEM client certificate, used together with `client_key`.
    pub client_cert: Option<PathBuf>,
    /// PEM PKCS#8 private key for `client_cert`.
    pub client_key: Option<PathBuf>,
    /// PEM CA certificate to trust in addition to (or instead of) the system roots.
    pub ca_file: Option<PathBuf>,
    /// Keep the platform trust store. When false only `ca_file` is trusted.
    pub use_system_roots: bool,
    /// Accept invalid certificates and hostnames.
    pub insecure: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            client_cert: None,
            client_key: None,
            ca_file: None,
            use_system_roots: true,
            insecure: false,
        }
    }
}

impl TlsOptions {
    /// Trust only the given CA file.
    pub fn with_custom_ca(ca_file: impl Into<PathBuf>) -> Self {
        Self {
            ca_file: Some(ca_file.into()),
            use_system_roots: false,
            ..Default::default()
        }
    }

    pub fn build(&self) -> Result<TlsConnector> {
        let mut builder = TlsConnector::builder();

        if let (Some(cert), Some(key)) = (&self.client_cert, &self.client_key) {
            debug!(target: "Sepp/Tls", "Loading client identity from {}", cert.display());
            let cert = std::fs::read(cert)?;
            let key = std::fs::read(key)?;
            builder.identity(Identity::from_pkcs8(&cert, &key)?);
        }

        if let Some(ca_file) = &self.ca_file {
            debug!(target: "Sepp/Tls", "Loading CA certificate from {}", ca_file.display());
            let pem = std::fs::read(ca_file)?;
            builder.add_root_certificate(Certificate::from_pem(&pem)?);
            builder.disable_built_in_roots(!self.use_system_roots);
        }

        if self.insecure {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        Ok(builder.build()?)
    }
}
