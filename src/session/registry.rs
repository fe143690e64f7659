use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::{
    common::types::{SongId, UserId},
    session::{
        clock::{Clock, SystemClock, elapsed_between},
        model::{
            FinalizedInterval, PauseOutcome, PlaybackSession, ResumeOutcome, SessionError,
            StartOutcome,
        },
    },
};

/// Authoritative map from user to their current playback session.
///
/// Every operation runs under the shard lock of the user's key, so two
/// mutations for the same user never interleave while different users only
/// contend when they hash to the same shard. No lock is held across an
/// `.await`; all operations are synchronous.
pub struct SessionRegistry {
    sessions: DashMap<UserId, PlaybackSession>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Opens a session for `song_id`, resumes it if it is the paused current
    /// song, or finalizes the current song first when switching.
    pub fn start_or_resume(&self, user_id: &UserId, song_id: &SongId) -> StartOutcome {
        let now = self.clock.now();

        match self.sessions.entry(user_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(PlaybackSession::start(user_id.clone(), song_id.clone(), now));
                debug!("session created: user={} song={}", user_id, song_id);
                StartOutcome::Created
            }
            Entry::Occupied(mut slot) => {
                let session = slot.get_mut();
                if session.song_id == *song_id {
                    if session.is_playing {
                        session.last_activity = now;
                        StartOutcome::AlreadyPlaying
                    } else {
                        session.open_segment(now);
                        debug!("session resumed by play: user={} song={}", user_id, song_id);
                        StartOutcome::Resumed
                    }
                } else {
                    let previous = slot.insert(PlaybackSession::start(
                        user_id.clone(),
                        song_id.clone(),
                        now,
                    ));
                    debug!(
                        "session switched: user={} from={} to={}",
                        user_id, previous.song_id, song_id
                    );
                    StartOutcome::Replaced {
                        finalized: previous.finalize(now),
                    }
                }
            }
        }
    }

    /// Closes the open segment. Never finalizes.
    pub fn pause(&self, user_id: &UserId) -> PauseOutcome {
        let now = self.clock.now();

        let Some(mut session) = self.sessions.get_mut(user_id) else {
            return PauseOutcome::NoSession;
        };
        if !session.is_playing {
            return PauseOutcome::AlreadyPaused;
        }
        session.close_segment(now);
        PauseOutcome::Paused {
            accumulated_seconds: session.accumulated_seconds(),
        }
    }

    /// Reopens the segment of the current song. A different song is
    /// rejected and the session is left untouched.
    pub fn resume(&self, user_id: &UserId, song_id: &SongId) -> Result<ResumeOutcome, SessionError> {
        let now = self.clock.now();

        let mut session = self
            .sessions
            .get_mut(user_id)
            .ok_or(SessionError::NoSession)?;
        if session.song_id != *song_id {
            return Err(SessionError::SongMismatch {
                current: session.song_id.clone(),
                requested: song_id.clone(),
            });
        }
        if session.is_playing {
            return Ok(ResumeOutcome::AlreadyPlaying);
        }
        session.open_segment(now);
        Ok(ResumeOutcome::Resumed)
    }

    /// Removes the user's session and returns its interval if anything was
    /// played. Concurrent callers race on the removal, so at most one of
    /// them ever sees the interval.
    pub fn finalize(&self, user_id: &UserId) -> Option<FinalizedInterval> {
        let now = self.clock.now();
        let (_, session) = self.sessions.remove(user_id)?;
        debug!(
            "session finalized: user={} song={}",
            session.user_id, session.song_id
        );
        session.finalize(now)
    }

    /// Finalizes paused sessions with no activity for longer than `max_idle`.
    pub fn finalize_idle(&self, max_idle: Duration) -> Vec<FinalizedInterval> {
        let now = self.clock.now();
        let is_idle = |session: &PlaybackSession| {
            !session.is_playing && elapsed_between(session.last_activity, now) > max_idle
        };

        let candidates: Vec<UserId> = self
            .sessions
            .iter()
            .filter(|entry| is_idle(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter_map(|user_id| self.sessions.remove_if(&user_id, |_, s| is_idle(s)))
            .filter_map(|(_, session)| session.finalize(now))
            .collect()
    }

    /// Finalizes every tracked session. Used once the process stops taking
    /// connections, so nothing still open is lost.
    pub fn finalize_all(&self) -> Vec<FinalizedInterval> {
        let now = self.clock.now();
        let users: Vec<UserId> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        users
            .into_iter()
            .filter_map(|user_id| self.sessions.remove(&user_id))
            .filter_map(|(_, session)| session.finalize(now))
            .collect()
    }

    pub fn snapshot(&self, user_id: &UserId) -> Option<PlaybackSession> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn playing_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_playing).count()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use time::OffsetDateTime;

    use super::*;
    use crate::session::clock::ManualClock;

    fn registry() -> (Arc<ManualClock>, SessionRegistry) {
        let clock = Arc::new(ManualClock::at_epoch());
        let registry = SessionRegistry::with_clock(clock.clone());
        (clock, registry)
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn song(id: &str) -> SongId {
        SongId::from(id)
    }

    #[test]
    fn test_play_creates_session() {
        let (_, registry) = registry();
        let outcome = registry.start_or_resume(&user("alice"), &song("A"));
        assert_eq!(outcome, StartOutcome::Created);

        let session = registry.snapshot(&user("alice")).unwrap();
        assert!(session.is_playing);
        assert_eq!(session.accumulated, Duration::ZERO);
        assert_eq!(session.song_id, song("A"));
    }

    #[test]
    fn test_pause_resume_stop_scenario() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(10);
        assert_eq!(
            registry.pause(&alice),
            PauseOutcome::Paused {
                accumulated_seconds: 10
            }
        );
        let paused = registry.snapshot(&alice).unwrap();
        assert!(!paused.is_playing);
        assert_eq!(paused.accumulated_seconds(), 10);

        clock.advance_secs(5);
        assert_eq!(registry.resume(&alice, &song("A")), Ok(ResumeOutcome::Resumed));
        clock.advance_secs(10);

        let interval = registry.finalize(&alice).unwrap();
        assert_eq!(interval.duration_seconds, 20);
        assert_eq!(interval.started_at, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(interval.song_id, song("A"));
        assert!(registry.snapshot(&alice).is_none());
    }

    #[test]
    fn test_many_pause_cycles_sum_segments() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        let mut expected_ms = 0;
        for segment_ms in [1_200u64, 3_300, 700, 4_900] {
            clock.advance_millis(segment_ms);
            expected_ms += segment_ms;
            registry.pause(&alice);
            clock.advance_secs(30);
            registry.resume(&alice, &song("A")).unwrap();
        }
        clock.advance_millis(400);
        expected_ms += 400;

        let interval = registry.finalize(&alice).unwrap();
        assert_eq!(interval.duration_seconds, (expected_ms + 500) / 1000);
    }

    #[test]
    fn test_pause_never_finalizes() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(3);
        registry.pause(&alice);
        assert_eq!(registry.pause(&alice), PauseOutcome::AlreadyPaused);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pause_without_session() {
        let (_, registry) = registry();
        assert_eq!(registry.pause(&user("nobody")), PauseOutcome::NoSession);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_accumulated_only_grows_while_paused() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(4);
        registry.pause(&alice);
        clock.advance_secs(100);

        let interval = registry.finalize(&alice).unwrap();
        assert_eq!(interval.duration_seconds, 4);
    }

    #[test]
    fn test_play_same_song_while_paused_resumes() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(6);
        registry.pause(&alice);
        clock.advance_secs(2);

        assert_eq!(
            registry.start_or_resume(&alice, &song("A")),
            StartOutcome::Resumed
        );
        clock.advance_secs(4);
        assert_eq!(registry.finalize(&alice).unwrap().duration_seconds, 10);
    }

    #[test]
    fn test_play_same_song_while_playing_is_idempotent() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(5);
        assert_eq!(
            registry.start_or_resume(&alice, &song("A")),
            StartOutcome::AlreadyPlaying
        );
        clock.advance_secs(5);
        assert_eq!(registry.finalize(&alice).unwrap().duration_seconds, 10);
    }

    #[test]
    fn test_song_switch_finalizes_previous() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(12);

        let outcome = registry.start_or_resume(&alice, &song("B"));
        let finalized = outcome.finalized().unwrap();
        assert_eq!(finalized.song_id, song("A"));
        assert_eq!(finalized.duration_seconds, 12);

        let current = registry.snapshot(&alice).unwrap();
        assert_eq!(current.song_id, song("B"));
        assert_eq!(current.accumulated, Duration::ZERO);
        assert_eq!(current.started_at, OffsetDateTime::UNIX_EPOCH + Duration::from_secs(12));
    }

    #[test]
    fn test_song_switch_with_zero_time_reports_nothing() {
        let (_, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        let outcome = registry.start_or_resume(&alice, &song("B"));
        assert_eq!(outcome, StartOutcome::Replaced { finalized: None });
        assert_eq!(registry.snapshot(&alice).unwrap().song_id, song("B"));
    }

    #[test]
    fn test_resume_other_song_is_mismatch() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(7);
        registry.pause(&alice);
        let before = registry.snapshot(&alice).unwrap();

        clock.advance_secs(3);
        let err = registry.resume(&alice, &song("B")).unwrap_err();
        assert_eq!(
            err,
            SessionError::SongMismatch {
                current: song("A"),
                requested: song("B"),
            }
        );
        assert_eq!(registry.snapshot(&alice).unwrap(), before);
    }

    #[test]
    fn test_resume_without_session() {
        let (_, registry) = registry();
        assert_eq!(
            registry.resume(&user("alice"), &song("A")),
            Err(SessionError::NoSession)
        );
    }

    #[test]
    fn test_resume_while_playing_is_noop() {
        let (_, registry) = registry();
        let alice = user("alice");
        registry.start_or_resume(&alice, &song("A"));
        assert_eq!(
            registry.resume(&alice, &song("A")),
            Ok(ResumeOutcome::AlreadyPlaying)
        );
    }

    #[test]
    fn test_zero_duration_finalize_removes_without_interval() {
        let (clock, registry) = registry();
        let bob = user("bob");

        registry.start_or_resume(&bob, &song("X"));
        clock.advance_millis(300);
        assert!(registry.finalize(&bob).is_none());
        assert!(registry.snapshot(&bob).is_none());
    }

    #[test]
    fn test_finalize_rounds_to_whole_seconds() {
        let (clock, registry) = registry();
        let bob = user("bob");

        registry.start_or_resume(&bob, &song("X"));
        clock.advance_millis(1_600);
        assert_eq!(registry.finalize(&bob).unwrap().duration_seconds, 2);
    }

    #[test]
    fn test_finalize_is_at_most_once() {
        let (clock, registry) = registry();
        let alice = user("alice");

        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(9);
        assert!(registry.finalize(&alice).is_some());
        assert!(registry.finalize(&alice).is_none());
    }

    #[test]
    fn test_concurrent_finalize_single_winner() {
        let (clock, registry) = registry();
        let alice = user("alice");
        registry.start_or_resume(&alice, &song("A"));
        clock.advance_secs(30);

        let winners = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| registry.finalize(&alice)))
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .count()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_users_are_independent() {
        let (clock, registry) = registry();
        let users: Vec<UserId> = (0..8).map(|i| user(&format!("u{}", i))).collect();

        thread::scope(|scope| {
            for u in &users {
                let registry = &registry;
                scope.spawn(move || {
                    registry.start_or_resume(u, &song("A"));
                });
            }
        });
        clock.advance_secs(10);
        thread::scope(|scope| {
            for u in users.iter().step_by(2) {
                let registry = &registry;
                scope.spawn(move || {
                    registry.pause(u);
                });
            }
        });
        clock.advance_secs(5);

        for (i, u) in users.iter().enumerate() {
            let expected = if i % 2 == 0 { 10 } else { 15 };
            assert_eq!(registry.finalize(u).unwrap().duration_seconds, expected);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_finalize_idle_only_paused_sessions() {
        let (clock, registry) = registry();
        let alice = user("alice");
        let bob = user("bob");

        registry.start_or_resume(&alice, &song("A"));
        registry.start_or_resume(&bob, &song("B"));
        clock.advance_secs(8);
        registry.pause(&alice);
        clock.advance_secs(120);

        let swept = registry.finalize_idle(Duration::from_secs(60));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].user_id, alice);
        assert_eq!(swept[0].duration_seconds, 8);
        assert!(registry.snapshot(&alice).is_none());
        assert!(registry.snapshot(&bob).is_some());
    }

    #[test]
    fn test_counts() {
        let (_, registry) = registry();
        registry.start_or_resume(&user("a"), &song("1"));
        registry.start_or_resume(&user("b"), &song("2"));
        registry.pause(&user("b"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.playing_count(), 1);
    }

    #[test]
    fn test_finalize_all_drains_every_session() {
        let (clock, registry) = registry();
        registry.start_or_resume(&user("u1"), &song("A"));
        registry.start_or_resume(&user("u2"), &song("B"));
        registry.start_or_resume(&user("u3"), &song("C"));
        clock.advance_secs(6);
        registry.pause(&user("u2"));
        clock.advance_secs(4);

        let mut drained: Vec<(String, u64)> = registry
            .finalize_all()
            .into_iter()
            .map(|i| (i.user_id.0, i.duration_seconds))
            .collect();
        drained.sort();

        assert_eq!(
            drained,
            vec![("u1".into(), 10), ("u2".into(), 6), ("u3".into(), 10)]
        );
        assert!(registry.is_empty());
        assert!(registry.finalize_all().is_empty());
    }
}
