//! Room session
//!
//! [`Room::connect`] hands finished [`ConnectOptions`] to a [`Connector`],
//! the external subsystem that does signaling, ICE and media setup. When the
//! connector reports success, the room creates its [`LocalParticipant`] with
//! the option's tracks already published. [`Room::disconnect`] tears the
//! session down and releases the participant.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use confab_room_core::{ConnectOptionsBuilder, Connector, HandleRegistry, MediaEngine, Room, RoomResult};
//! # async fn example(connector: Arc<dyn Connector>, engine: Arc<dyn MediaEngine>) -> RoomResult<()> {
//! let handles = HandleRegistry::new();
//! let options = ConnectOptionsBuilder::new("token").room_name("standup").build(&handles)?;
//!
//! let room = Room::connect(options, connector, engine).await?;
//! println!("joined {} as {}", room.name(), room.local_participant().identity());
//!
//! room.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::connect::ConnectOptions;
use crate::error::{RoomError, RoomResult};
use crate::participant::{LocalParticipant, MediaEngine, ParticipantSid};
use crate::track::LocalTrack;

/// What the server told us about the room we joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDescriptor {
    pub sid: String,
    pub name: String,
    pub local_participant_sid: ParticipantSid,
    pub local_participant_identity: String,
}

/// Connection-establishment subsystem
#[async_trait]
pub trait Connector: Send + Sync {
    /// Join the room described by `options`, publishing its tracks
    async fn connect(&self, options: &ConnectOptions) -> RoomResult<RoomDescriptor>;

    /// Leave the room
    async fn disconnect(&self, room_sid: &str) -> RoomResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Connected,
    Disconnected,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomState::Connected => write!(f, "connected"),
            RoomState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A connected room session
pub struct Room {
    sid: String,
    name: String,
    local_participant: Arc<LocalParticipant>,
    connector: Arc<dyn Connector>,
    state: RwLock<RoomState>,
}

impl Room {
    /// Connect using `options`. The options are consumed; their tracks end up
    /// published by the room's local participant.
    pub async fn connect(
        options: ConnectOptions,
        connector: Arc<dyn Connector>,
        engine: Arc<dyn MediaEngine>,
    ) -> RoomResult<Room> {
        info!(room = ?options.room_name(), insights = options.insights_enabled(), "Connecting to room");

        let descriptor = match connector.connect(&options).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                error!(room = ?options.room_name(), error = %e, "Failed to connect to room");
                return Err(e);
            }
        };

        let tracks = options
            .audio_tracks()
            .iter()
            .cloned()
            .map(LocalTrack::from)
            .chain(options.video_tracks().iter().cloned().map(LocalTrack::from));

        let local_participant = LocalParticipant::with_published_tracks(
            descriptor.local_participant_sid.clone(),
            descriptor.local_participant_identity.clone(),
            engine,
            tracks,
        );

        info!(
            room = %descriptor.name,
            room_sid = %descriptor.sid,
            participant = %descriptor.local_participant_sid,
            tracks = local_participant.track_count(),
            "Connected to room"
        );

        Ok(Room {
            sid: descriptor.sid,
            name: descriptor.name,
            local_participant: Arc::new(local_participant),
            connector,
            state: RwLock::new(RoomState::Connected),
        })
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_participant(&self) -> &Arc<LocalParticipant> {
        &self.local_participant
    }

    pub fn state(&self) -> RoomState {
        *self.state.read()
    }

    /// Leave the room and release the local participant
    ///
    /// The participant is released even if the connector reports an error,
    /// and a participant the host already released is left alone. Either
    /// way the connector's outcome is what gets returned.
    pub async fn disconnect(&self) -> RoomResult<()> {
        {
            let mut state = self.state.write();
            if *state != RoomState::Connected {
                return Err(RoomError::InvalidState {
                    expected: RoomState::Connected.to_string(),
                    actual: state.to_string(),
                });
            }
            *state = RoomState::Disconnected;
        }

        let result = self.connector.disconnect(&self.sid).await;
        if let Err(e) = &result {
            error!(room_sid = %self.sid, error = %e, "Connector failed to disconnect");
        }

        match self.local_participant.release() {
            Ok(released) => {
                info!(room_sid = %self.sid, tracks_released = released, "Disconnected from room");
            }
            Err(RoomError::Released { .. }) => {
                debug!(room_sid = %self.sid, "Local participant was already released");
            }
            Err(e) => return Err(e),
        }
        result
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("sid", &self.sid)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("local_participant", &self.local_participant)
            .finish()
    }
}
