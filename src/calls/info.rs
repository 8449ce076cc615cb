//! Connection parameters and options for a [`super::Call`].

use crate::socket::TlsOptions;
use crate::socket::consts::DEFAULT_ENDPOINT;
use std::path::PathBuf;

/// Where and as whom a call is placed.
pub trait CallInfo {
    /// Signaling websocket endpoint.
    fn sig_endpoint(&self) -> &str;
    /// JWT used as bearer token. Empty means unauthenticated.
    fn auth_token(&self) -> &str;
    /// Initiator of the call, sent as `from`.
    fn client_id(&self) -> &str;
    /// Destination conference, sent as `to`.
    fn conf_id(&self) -> &str;
}

/// Default [`CallInfo`] implementation.
#[derive(Debug, Clone)]
pub struct CallDetails {
    pub sig_endpoint: String,
    pub auth_token: String,
    pub client_id: String,
    pub conf_id: String,
}

impl Default for CallDetails {
    fn default() -> Self {
        Self {
            sig_endpoint: DEFAULT_ENDPOINT.to_string(),
            auth_token: String::new(),
            client_id: String::new(),
            conf_id: String::new(),
        }
    }
}

impl CallInfo for CallDetails {
    fn sig_endpoint(&self) -> &str {
        &self.sig_endpoint
    }

    fn auth_token(&self) -> &str {
        &self.auth_token
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn conf_id(&self) -> &str {
        &self.conf_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Trust only this PEM CA file instead of the system roots.
    pub ca_file: Option<PathBuf>,
    /// Platform version tag sent in `call_start`.
    pub platform: Option<String>,
    /// Accept invalid certificates and hostnames.
    pub insecure: bool,
}

impl CallOptions {
    pub fn with_custom_ca_file(mut self, ca_file: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(ca_file.into());
        self
    }

    pub fn with_platform_version(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// TLS settings for the transport, `None` when the defaults apply.
    pub(crate) fn tls_options(&self) -> Option<TlsOptions> {
        let mut tls = match &self.ca_file {
            Some(ca_file) => TlsOptions::with_custom_ca(ca_file),
            None if self.insecure => TlsOptions::default(),
            None => return None,
        };
        tls.insecure = self.insecure;
        Some(tls)
    }
}
