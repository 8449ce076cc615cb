use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Not running")]
    NotRunning,
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("Auth token is not a valid header value")]
    InvalidToken,
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("WebSocket connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("Connect cancelled by shutdown")]
    Cancelled,
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SocketError>;
