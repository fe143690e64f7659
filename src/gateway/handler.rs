use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    analytics::EventDispatcher,
    common::{
        errors::GatewayError,
        types::{ConnectionId, SongId, UserId},
    },
    gateway::{ChannelGate, SongResolver},
    protocol::{Command, InboundFrame, OutgoingMessage},
    session::{FinalizedInterval, PauseOutcome, SessionRegistry, StartOutcome},
};

/// Everything a connection needs, shared by all connections.
#[derive(Clone)]
pub struct GatewayServices {
    pub registry: Arc<SessionRegistry>,
    pub songs: Arc<SongResolver>,
    pub dispatcher: EventDispatcher,
}

struct CommandOutcome {
    reply: OutgoingMessage,
    finalized: Option<FinalizedInterval>,
}

impl CommandOutcome {
    fn reply(reply: OutgoingMessage) -> Self {
        Self {
            reply,
            finalized: None,
        }
    }
}

/// Dispatches one control channel's commands onto the session registry.
///
/// Commands must be fed in arrival order, one at a time. Replies are pushed
/// to `outbound`; finalized intervals go to the event dispatcher after the
/// reply has been queued.
pub struct ConnectionHandler {
    connection_id: ConnectionId,
    user_id: UserId,
    services: GatewayServices,
    outbound: flume::Sender<OutgoingMessage>,
    gate: ChannelGate,
}

impl ConnectionHandler {
    pub fn new(
        user_id: UserId,
        services: GatewayServices,
        outbound: flume::Sender<OutgoingMessage>,
    ) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            user_id,
            services,
            outbound,
            gate: ChannelGate::new(),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    pub async fn handle_frame(&self, frame: InboundFrame) {
        match Command::try_from(frame) {
            Ok(command) => self.handle(command).await,
            Err(e) => {
                warn!("Rejected command: conn={} err={}", self.connection_id, e);
                self.send(OutgoingMessage::from(&e));
            }
        }
    }

    pub async fn handle(&self, command: Command) {
        info!(
            "Command {} song={} user={} conn={}",
            command.name(),
            command.song_id(),
            self.user_id,
            self.connection_id
        );

        let outcome = match &command {
            Command::Play(song_id) => self.play(song_id).await,
            Command::Pause(song_id) => self.pause(song_id),
            Command::Stop(song_id) => self.stop(song_id),
            Command::Resume(song_id) => self.resume(song_id),
        };

        let Some(CommandOutcome { reply, finalized }) = outcome else {
            debug!(
                "Ignoring {} after disconnect: conn={}",
                command.name(),
                self.connection_id
            );
            return;
        };

        self.send(reply);
        if let Some(interval) = finalized {
            self.services.dispatcher.dispatch(interval);
        }
    }

    /// Finalizes the user's session when the channel goes away. Safe to call
    /// more than once; only the first call does anything.
    pub fn disconnect(&self) {
        let finalized = self
            .gate
            .close(|| self.services.registry.finalize(&self.user_id))
            .flatten();

        match finalized {
            Some(interval) => {
                info!(
                    "Disconnect finalized song={} duration={}s user={} conn={}",
                    interval.song_id, interval.duration_seconds, self.user_id, self.connection_id
                );
                self.services.dispatcher.dispatch(interval);
            }
            None => debug!("Disconnect with nothing to report: conn={}", self.connection_id),
        }
    }

    async fn play(&self, song_id: &SongId) -> Option<CommandOutcome> {
        let start = self
            .gate
            .run(|| self.services.registry.start_or_resume(&self.user_id, song_id))?;

        if let StartOutcome::Replaced { .. } = start {
            debug!("Song switch for user={} to song={}", self.user_id, song_id);
        }
        let finalized = start.into_finalized();

        // The session stays open whatever happens below; a repeated play
        // resumes it instead of counting twice.
        let reply = match self.services.songs.resolve(song_id).await {
            Ok(song) => {
                debug!("Resolved song={} title={}", song_id, song.title);
                OutgoingMessage::song_data(song)
            }
            Err(e) => {
                warn!("Play failed: song={} conn={} err={}", song_id, self.connection_id, e);
                OutgoingMessage::from(&e)
            }
        };

        Some(CommandOutcome { reply, finalized })
    }

    fn pause(&self, song_id: &SongId) -> Option<CommandOutcome> {
        let outcome = self
            .gate
            .run(|| self.services.registry.pause(&self.user_id))?;

        if let PauseOutcome::Paused {
            accumulated_seconds,
        } = outcome
        {
            debug!(
                "Paused user={} accumulated={}s",
                self.user_id, accumulated_seconds
            );
        }
        Some(CommandOutcome::reply(OutgoingMessage::status(format!(
            "Song {} paused",
            song_id
        ))))
    }

    fn stop(&self, song_id: &SongId) -> Option<CommandOutcome> {
        let finalized = self
            .gate
            .run(|| self.services.registry.finalize(&self.user_id))?;

        Some(CommandOutcome {
            reply: OutgoingMessage::status(format!("Song {} stopped", song_id)),
            finalized,
        })
    }

    fn resume(&self, song_id: &SongId) -> Option<CommandOutcome> {
        let result = self
            .gate
            .run(|| self.services.registry.resume(&self.user_id, song_id))?;

        let reply = match result {
            Ok(_) => OutgoingMessage::status(format!("Song {} resumed", song_id)),
            Err(e) => {
                let err = GatewayError::from(e);
                debug!("Resume rejected: conn={} err={}", self.connection_id, err);
                OutgoingMessage::from(&err)
            }
        };
        Some(CommandOutcome::reply(reply))
    }

    fn send(&self, message: OutgoingMessage) {
        if self.outbound.send(message).is_err() {
            debug!("Reply dropped, channel gone: conn={}", self.connection_id);
        }
    }
}
