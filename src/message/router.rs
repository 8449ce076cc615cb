//! Decoding of inbound text frames into typed messages.
//!
//! Decoding is two-pass: the envelope is decoded on its own first, then its
//! discriminator selects the payload decoder for the full frame. This keeps
//! routing independent of the payload shape.

use super::{Envelope, MessageType, Msg, SeppMessage};
use log::trace;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes one text frame.
///
/// An unknown discriminator is not an error: the frame comes back as
/// [`SeppMessage::Unrecognized`] carrying the envelope.
pub fn decode(frame: &str) -> Result<SeppMessage, DecodeError> {
    let envelope: Envelope = serde_json::from_str(frame).map_err(DecodeError::Envelope)?;

    let Some(kind) = envelope.message_type() else {
        trace!(target: "Sepp/Router", "No decoder for message-type {:?}", envelope.kind);
        return Ok(SeppMessage::Unrecognized(envelope));
    };

    let msg = match kind {
        MessageType::CallStart => SeppMessage::CallStart(payload(frame, kind)?),
        MessageType::CallRejected => SeppMessage::CallRejected(payload(frame, kind)?),
        MessageType::CallAccepted => SeppMessage::CallAccepted(payload(frame, kind)?),
        MessageType::SdpUpdate => SeppMessage::SdpUpdate(payload(frame, kind)?),
        MessageType::CallTerminate => SeppMessage::CallTerminate(payload(frame, kind)?),
        MessageType::CallTerminated => SeppMessage::CallTerminated(payload(frame, kind)?),
        MessageType::CallResume => SeppMessage::CallResume(payload(frame, kind)?),
        MessageType::CallResumed => SeppMessage::CallResumed(payload(frame, kind)?),
        MessageType::Chat => SeppMessage::Chat(payload(frame, kind)?),
        MessageType::SetPresenter => SeppMessage::SetPresenter(payload(frame, kind)?),
        MessageType::Desktopstreaming => SeppMessage::Desktopstreaming(payload(frame, kind)?),
        MessageType::MuteVideo => SeppMessage::MuteVideo(payload(frame, kind)?),
        MessageType::SourceUpdate => SeppMessage::SourceUpdate(payload(frame, kind)?),
        MessageType::Memberlist => SeppMessage::Memberlist(payload(frame, kind)?),
        MessageType::Recording => SeppMessage::Recording(payload(frame, kind)?),
    };
    Ok(msg)
}

fn payload<D>(frame: &str, kind: MessageType) -> Result<Msg<D>, DecodeError>
where
    D: DeserializeOwned + Default,
{
    serde_json::from_str(frame).map_err(|source| DecodeError::Payload { kind, source })
}
