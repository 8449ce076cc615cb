use crate::socket::TlsOptions;
use crate::socket::consts::DEFAULT_ENDPOINT;

/// Connection settings for a [`crate::socket::SeppTransport`].
#[derive(Clone, Debug)]
pub struct SeppConfig {
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <token>` during the handshake.
    pub auth_token: Option<String>,
    /// `None` uses the platform defaults for `wss://` endpoints.
    pub tls: Option<TlsOptions>,
}

impl Default for SeppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            auth_token: None,
            tls: None,
        }
    }
}

impl SeppConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }
}
