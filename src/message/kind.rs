//! Message discriminators of the SEPP wire vocabulary.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Discriminator carried in the `type` field of every envelope.
///
/// The set is closed. A discriminator outside of it is surfaced as
/// [`super::SeppMessage::Unrecognized`] by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client initiates a call with an SDP offer.
    CallStart,
    /// Server rejected the call.
    CallRejected,
    /// Server accepted the call and assigned a call id.
    CallAccepted,
    /// SDP renegotiation, sent by either side.
    SdpUpdate,
    /// Client asks the server to end the call.
    CallTerminate,
    /// Server confirms the call has ended.
    CallTerminated,
    /// Client resumes a suspended call.
    CallResume,
    /// Server confirms a resumed call.
    CallResumed,
    Chat,
    SetPresenter,
    Desktopstreaming,
    MuteVideo,
    /// Podium layout change.
    SourceUpdate,
    /// Roster change.
    Memberlist,
    Recording,
}

impl MessageType {
    /// All message types in wire order.
    pub const ALL: [MessageType; 15] = [
        Self::CallStart,
        Self::CallRejected,
        Self::CallAccepted,
        Self::SdpUpdate,
        Self::CallTerminate,
        Self::CallTerminated,
        Self::CallResume,
        Self::CallResumed,
        Self::Chat,
        Self::SetPresenter,
        Self::Desktopstreaming,
        Self::MuteVideo,
        Self::SourceUpdate,
        Self::Memberlist,
        Self::Recording,
    ];

    /// The discriminator string used on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CallStart => "call_start",
            Self::CallRejected => "call_rejected",
            Self::CallAccepted => "call_accepted",
            Self::SdpUpdate => "sdp_update",
            Self::CallTerminate => "call_terminate",
            Self::CallTerminated => "call_terminated",
            Self::CallResume => "call_resume",
            Self::CallResumed => "call_resumed",
            Self::Chat => "chat",
            Self::SetPresenter => "set_presenter",
            Self::Desktopstreaming => "desktopstreaming",
            Self::MuteVideo => "mute_video",
            Self::SourceUpdate => "source_update",
            Self::Memberlist => "memberlist",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a discriminator is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message type: {0}")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownMessageType(s.to_string()))
    }
}
