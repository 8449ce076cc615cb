//! Websocket transport for SEPP signaling.

pub mod consts;
pub mod error;
pub mod tls;
pub mod transport;

pub use error::{Result, SocketError};
pub use tls::TlsOptions;
pub use transport::{SeppTransport, Signaling};
