use std::time::Duration;

use time::OffsetDateTime;

use crate::{
    common::types::{SongId, UserId},
    session::clock::{elapsed_between, whole_seconds},
};

/// A user's in-progress or paused listen to one song.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub user_id: UserId,
    pub song_id: SongId,
    /// When the song was first played. Reported as `played_at`.
    pub started_at: OffsetDateTime,
    /// Playback from completed segments, not yet reported.
    pub accumulated: Duration,
    pub is_playing: bool,
    /// Start of the open segment. Only meaningful while `is_playing`.
    pub segment_start: OffsetDateTime,
    pub last_activity: OffsetDateTime,
}

impl PlaybackSession {
    pub(crate) fn start(user_id: UserId, song_id: SongId, now: OffsetDateTime) -> Self {
        Self {
            user_id,
            song_id,
            started_at: now,
            accumulated: Duration::ZERO,
            is_playing: true,
            segment_start: now,
            last_activity: now,
        }
    }

    pub fn accumulated_seconds(&self) -> u64 {
        whole_seconds(self.accumulated)
    }

    /// Accumulated time plus the open segment, if any.
    pub fn played_until(&self, now: OffsetDateTime) -> Duration {
        if self.is_playing {
            self.accumulated + elapsed_between(self.segment_start, now)
        } else {
            self.accumulated
        }
    }

    pub(crate) fn open_segment(&mut self, now: OffsetDateTime) {
        self.is_playing = true;
        self.segment_start = now;
        self.last_activity = now;
    }

    pub(crate) fn close_segment(&mut self, now: OffsetDateTime) {
        self.accumulated += elapsed_between(self.segment_start, now);
        self.is_playing = false;
        self.last_activity = now;
    }

    /// Consumes the session. Nothing is reported for a listen that rounds
    /// to zero seconds.
    pub(crate) fn finalize(self, now: OffsetDateTime) -> Option<FinalizedInterval> {
        let duration_seconds = whole_seconds(self.played_until(now));
        if duration_seconds == 0 {
            return None;
        }
        Some(FinalizedInterval {
            user_id: self.user_id,
            song_id: self.song_id,
            started_at: self.started_at,
            duration_seconds,
        })
    }
}

/// A closed listen, ready to be reported as `song_played`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedInterval {
    pub user_id: UserId,
    pub song_id: SongId,
    pub started_at: OffsetDateTime,
    pub duration_seconds: u64,
}

/// What `start_or_resume` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// No session existed; a fresh one was opened.
    Created,
    /// The paused session for the same song was reopened.
    Resumed,
    /// The same song was already playing; nothing changed.
    AlreadyPlaying,
    /// A session for another song was finalized and replaced. The interval
    /// is `None` when the old listen rounded to zero seconds.
    Replaced { finalized: Option<FinalizedInterval> },
}

impl StartOutcome {
    pub fn finalized(&self) -> Option<&FinalizedInterval> {
        match self {
            Self::Replaced { finalized } => finalized.as_ref(),
            _ => None,
        }
    }

    pub fn into_finalized(self) -> Option<FinalizedInterval> {
        match self {
            Self::Replaced { finalized } => finalized,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused { accumulated_seconds: u64 },
    AlreadyPaused,
    NoSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    Resumed,
    AlreadyPlaying,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no active session")]
    NoSession,
    #[error("session is tracking song {current}, not {requested}")]
    SongMismatch { current: SongId, requested: SongId },
}
