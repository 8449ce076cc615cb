pub mod calls;
pub mod config;
pub mod message;
pub mod socket;

pub use calls::{Call, CallDetails, CallError, CallId, CallInfo, CallOptions};
pub use config::SeppConfig;
pub use message::{Sdp, SeppMessage};
pub use socket::{SeppTransport, Signaling, SocketError};
