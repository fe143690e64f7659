use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    common::types::{SongId, UserId},
    session::FinalizedInterval,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SongPlayed,
}

/// Analytics record for one completed listen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPlayedEvent {
    pub event: EventKind,
    pub user_id: UserId,
    pub song_id: SongId,
    #[serde(with = "time::serde::rfc3339")]
    pub played_at: OffsetDateTime,
    pub duration_played: u64,
}

impl From<FinalizedInterval> for SongPlayedEvent {
    fn from(interval: FinalizedInterval) -> Self {
        let played_at = interval
            .started_at
            .replace_nanosecond(0)
            .unwrap_or(interval.started_at);

        Self {
            event: EventKind::SongPlayed,
            user_id: interval.user_id,
            song_id: interval.song_id,
            played_at,
            duration_played: interval.duration_seconds,
        }
    }
}
