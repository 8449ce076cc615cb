//! SEPP wire vocabulary.
//!
//! Every frame is a JSON object made of a common [`Envelope`] and a
//! type-specific `data` object:
//!
//! ```json
//! {"type": "call_accepted", "msg_id": "", "from": "conf", "to": "client",
//!  "data": {"call_id": "C1", "sdp": {"type": "answer", "sdp": "..."}}}
//! ```
//!
//! # Architecture
//!
//! - [`MessageType`]: the closed set of discriminators
//! - [`Msg`]: envelope composed with one typed payload
//! - [`SeppMessage`]: one variant per discriminator, plus `Unrecognized`
//! - [`router::decode`]: two-pass decoder from a text frame

mod kind;
mod payload;
pub mod router;

pub use kind::{MessageType, UnknownMessageType};
pub use payload::{
    CallAcceptedData, CallRejectedData, CallResumeData, CallStartData, CallTerminateData, ChatData,
    Dimension, Media, Member, MemberlistData, ParticipantFlagData, RecordingData, Sdp,
    SdpUpdateData, SourceUpdateData,
};
pub use router::{DecodeError, decode};

use serde::{Deserialize, Serialize};

/// Header fields shared by every message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Raw discriminator. Kept as a string so unknown types survive decoding.
    #[serde(rename = "type", deserialize_with = "payload::nullable")]
    pub kind: String,
    #[serde(deserialize_with = "payload::nullable")]
    pub msg_id: String,
    /// Originating participant/client id.
    #[serde(deserialize_with = "payload::nullable")]
    pub from: String,
    /// Destination conference/session id.
    #[serde(deserialize_with = "payload::nullable")]
    pub to: String,
}

impl Envelope {
    pub fn new(kind: MessageType, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            msg_id: String::new(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Parsed discriminator, `None` if the type is not part of the vocabulary.
    pub fn message_type(&self) -> Option<MessageType> {
        self.kind.parse().ok()
    }
}

/// An envelope composed with its typed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de> + Default"))]
pub struct Msg<D> {
    #[serde(flatten)]
    pub envelope: Envelope,
    /// Missing or `null` decodes to the payload's default.
    #[serde(default, deserialize_with = "payload::nullable")]
    pub data: D,
}

impl<D> Msg<D> {
    pub fn new(envelope: Envelope, data: D) -> Self {
        Self { envelope, data }
    }
}

/// A fully decoded SEPP message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SeppMessage {
    CallStart(Msg<CallStartData>),
    CallRejected(Msg<CallRejectedData>),
    CallAccepted(Msg<CallAcceptedData>),
    SdpUpdate(Msg<SdpUpdateData>),
    CallTerminate(Msg<CallTerminateData>),
    CallTerminated(Msg<CallTerminateData>),
    CallResume(Msg<CallResumeData>),
    CallResumed(Msg<CallResumeData>),
    Chat(Msg<ChatData>),
    SetPresenter(Msg<ParticipantFlagData>),
    Desktopstreaming(Msg<ParticipantFlagData>),
    MuteVideo(Msg<ParticipantFlagData>),
    SourceUpdate(Msg<SourceUpdateData>),
    Memberlist(Msg<MemberlistData>),
    Recording(Msg<RecordingData>),
    /// Well-formed envelope whose discriminator is not in the vocabulary.
    Unrecognized(Envelope),
}

impl SeppMessage {
    /// The shared header of this message.
    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::CallStart(m) => &m.envelope,
            Self::CallRejected(m) => &m.envelope,
            Self::CallAccepted(m) => &m.envelope,
            Self::SdpUpdate(m) => &m.envelope,
            Self::CallTerminate(m) | Self::CallTerminated(m) => &m.envelope,
            Self::CallResume(m) | Self::CallResumed(m) => &m.envelope,
            Self::Chat(m) => &m.envelope,
            Self::SetPresenter(m) | Self::Desktopstreaming(m) | Self::MuteVideo(m) => &m.envelope,
            Self::SourceUpdate(m) => &m.envelope,
            Self::Memberlist(m) => &m.envelope,
            Self::Recording(m) => &m.envelope,
            Self::Unrecognized(envelope) => envelope,
        }
    }

    /// Mutable access to the shared header, e.g. to rewrite `from`/`to`.
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            Self::CallStart(m) => &mut m.envelope,
            Self::CallRejected(m) => &mut m.envelope,
            Self::CallAccepted(m) => &mut m.envelope,
            Self::SdpUpdate(m) => &mut m.envelope,
            Self::CallTerminate(m) | Self::CallTerminated(m) => &mut m.envelope,
            Self::CallResume(m) | Self::CallResumed(m) => &mut m.envelope,
            Self::Chat(m) => &mut m.envelope,
            Self::SetPresenter(m) | Self::Desktopstreaming(m) | Self::MuteVideo(m) => {
                &mut m.envelope
            }
            Self::SourceUpdate(m) => &mut m.envelope,
            Self::Memberlist(m) => &mut m.envelope,
            Self::Recording(m) => &mut m.envelope,
            Self::Unrecognized(envelope) => envelope,
        }
    }

    /// The discriminator, `None` for [`SeppMessage::Unrecognized`].
    pub fn message_type(&self) -> Option<MessageType> {
        let kind = match self {
            Self::CallStart(_) => MessageType::CallStart,
            Self::CallRejected(_) => MessageType::CallRejected,
            Self::CallAccepted(_) => MessageType::CallAccepted,
            Self::SdpUpdate(_) => MessageType::SdpUpdate,
            Self::CallTerminate(_) => MessageType::CallTerminate,
            Self::CallTerminated(_) => MessageType::CallTerminated,
            Self::CallResume(_) => MessageType::CallResume,
            Self::CallResumed(_) => MessageType::CallResumed,
            Self::Chat(_) => MessageType::Chat,
            Self::SetPresenter(_) => MessageType::SetPresenter,
            Self::Desktopstreaming(_) => MessageType::Desktopstreaming,
            Self::MuteVideo(_) => MessageType::MuteVideo,
            Self::SourceUpdate(_) => MessageType::SourceUpdate,
            Self::Memberlist(_) => MessageType::Memberlist,
            Self::Recording(_) => MessageType::Recording,
            Self::Unrecognized(_) => return None,
        };
        Some(kind)
    }

    /// Raw discriminator string as carried in the envelope.
    pub fn kind(&self) -> &str {
        &self.envelope().kind
    }

    pub fn call_start(from: &str, to: &str, data: CallStartData) -> Self {
        Self::CallStart(Msg::new(Envelope::new(MessageType::CallStart, from, to), data))
    }

    pub fn call_terminate(from: &str, to: &str, data: CallTerminateData) -> Self {
        Self::CallTerminate(Msg::new(
            Envelope::new(MessageType::CallTerminate, from, to),
            data,
        ))
    }

    pub fn sdp_update(from: &str, to: &str, data: SdpUpdateData) -> Self {
        Self::SdpUpdate(Msg::new(Envelope::new(MessageType::SdpUpdate, from, to), data))
    }

    pub fn mute_video(from: &str, to: &str, data: ParticipantFlagData) -> Self {
        Self::MuteVideo(Msg::new(Envelope::new(MessageType::MuteVideo, from, to), data))
    }
}
