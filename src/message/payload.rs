//! Typed `data` payloads for each message type.
//!
//! Every struct defaults missing and `null` fields, so a frame with a
//! sparse `data` object still decodes.

use serde::{Deserialize, Deserializer, Serialize};

// Peers serialize unset fields, lists included, as `null`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An SDP blob with its role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sdp {
    /// Either `offer` or `answer`.
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub sdp_type: String,
    #[serde(deserialize_with = "nullable")]
    pub sdp: String,
}

impl Sdp {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallStartData {
    #[serde(deserialize_with = "nullable")]
    pub sdp: Sdp,
    #[serde(deserialize_with = "nullable")]
    pub display_name: String,
    /// Client platform/version tag, only sent when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallRejectedData {
    #[serde(deserialize_with = "nullable")]
    pub reject_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallAcceptedData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub sdp: Sdp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdpUpdateData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub sdp: Sdp,
}

/// Shared by `call_terminate` and `call_terminated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallTerminateData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub term_code: i32,
}

/// Shared by `call_resume` and `call_resumed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallResumeData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub sdp: Sdp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    /// Sender client id.
    #[serde(rename = "cid", deserialize_with = "nullable")]
    pub client_id: String,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "ts", deserialize_with = "nullable")]
    pub timestamp: String,
}

/// Per-participant on/off flag, used by `set_presenter`, `desktopstreaming`
/// and `mute_video`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantFlagData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub on: bool,
    #[serde(rename = "cid", deserialize_with = "nullable")]
    pub client_id: String,
}

/// Position of one tile on the podium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimension {
    #[serde(rename = "w", deserialize_with = "nullable")]
    pub width: i32,
    #[serde(rename = "h", deserialize_with = "nullable")]
    pub height: i32,
    #[serde(deserialize_with = "nullable")]
    pub x: i32,
    #[serde(deserialize_with = "nullable")]
    pub y: i32,
}

/// Podium configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceUpdateData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(rename = "asrc", deserialize_with = "nullable")]
    pub audio_sources: Vec<i32>,
    #[serde(rename = "vsrc", deserialize_with = "nullable")]
    pub video_sources: Vec<i32>,
    #[serde(rename = "bcast", skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<bool>,
    #[serde(rename = "dims", deserialize_with = "nullable")]
    pub dimensions: Vec<Dimension>,
    #[serde(rename = "l", deserialize_with = "nullable")]
    pub layout: i32,
    #[serde(rename = "src", deserialize_with = "nullable")]
    pub sources: Vec<String>,
    #[serde(rename = "tovl", skip_serializing_if = "Option::is_none")]
    pub text_overlay: Option<bool>,
    #[serde(rename = "psrc", skip_serializing_if = "Option::is_none")]
    pub presenter_src: Option<i32>,
    #[serde(rename = "dsrc", skip_serializing_if = "Option::is_none")]
    pub desktopstreamer_src: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub active: bool,
    #[serde(deserialize_with = "nullable")]
    pub enabled: bool,
}

/// Participant entry in a memberlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    #[serde(rename = "cid", deserialize_with = "nullable")]
    pub client_id: String,
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Media playback entry in a memberlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    #[serde(rename = "mid", deserialize_with = "nullable")]
    pub media_id: String,
    #[serde(rename = "playid", deserialize_with = "nullable")]
    pub play_id: String,
}

/// Roster delta: members added, client ids removed, media currently playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberlistData {
    #[serde(deserialize_with = "nullable")]
    pub call_id: String,
    #[serde(deserialize_with = "nullable")]
    pub count: i32,
    #[serde(deserialize_with = "nullable")]
    pub add: Vec<Member>,
    #[serde(deserialize_with = "nullable")]
    pub del: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub media: Vec<Media>,
}
