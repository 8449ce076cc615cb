//! Call-related error types.

use crate::socket::SocketError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("call already in progress")]
    AlreadyInProgress,

    #[error("failed to connect")]
    ConnectFailed,

    #[error("timeout")]
    Timeout,

    #[error("call rejected: {code}")]
    Rejected { code: i32 },

    #[error("protocol error, unexpected msg-type: {kind}")]
    Protocol { kind: String },

    #[error("signaling channel closed")]
    ChannelClosed,

    #[error("no active call")]
    NoActiveCall,

    #[error("failed to send message: {0}")]
    Send(#[from] SocketError),

    #[error("failed to set up signaling: {0}")]
    Setup(#[source] SocketError),

    #[error("invalid call state transition: {0}")]
    InvalidTransition(#[from] super::state::InvalidTransition),
}

impl CallError {
    /// The server's reject code, if the call was rejected.
    pub fn reject_code(&self) -> Option<i32> {
        match self {
            Self::Rejected { code } => Some(*code),
            _ => None,
        }
    }
}
