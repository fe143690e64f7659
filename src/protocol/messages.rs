use serde::{Deserialize, Serialize};

use crate::common::{errors::GatewayError, types::SongId};

/// Raw control-channel frame: `{ "type": "...", "songId": "..." }`.
///
/// Both fields are optional so any JSON object decodes; a missing or unknown
/// tag is answered with an error instead of closing the channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "songId", default)]
    pub song_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(SongId),
    Pause(SongId),
    Stop(SongId),
    Resume(SongId),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Pause(_) => "pause",
            Self::Stop(_) => "stop",
            Self::Resume(_) => "resume",
        }
    }

    pub fn song_id(&self) -> &SongId {
        match self {
            Self::Play(id) | Self::Pause(id) | Self::Stop(id) | Self::Resume(id) => id,
        }
    }
}

impl TryFrom<InboundFrame> for Command {
    type Error = GatewayError;

    fn try_from(frame: InboundFrame) -> Result<Self, Self::Error> {
        let kind = frame.kind.unwrap_or_default();
        let build: fn(SongId) -> Command = match kind.as_str() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "resume" => Command::Resume,
            other => return Err(GatewayError::InvalidCommand(other.to_string())),
        };

        let song_id = frame.song_id.as_deref().map(str::trim).unwrap_or_default();
        if song_id.is_empty() {
            return Err(GatewayError::InvalidCommand(format!(
                "{} without songId",
                kind
            )));
        }
        Ok(build(SongId::from(song_id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPayload {
    pub id: String,
    pub title: String,
    pub audio_url: String,
}

/// Responses written back on the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    SongData { message: String, song: SongPayload },
    Status { message: String },
    Error { message: String },
}

impl OutgoingMessage {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn song_data(song: SongPayload) -> Self {
        Self::SongData {
            message: format!("Now playing: {}", song.title),
            song,
        }
    }
}

impl From<&GatewayError> for OutgoingMessage {
    fn from(err: &GatewayError) -> Self {
        Self::error(err.client_message())
    }
}
