//! room-core: connection options and local track publishing for confab rooms
//!
//! This crate sits between a host application and the native media engine.
//! It covers two jobs:
//!
//! - assembling validated, immutable [`ConnectOptions`] from optional host
//!   inputs (see [`connect`])
//! - keeping the set of tracks a [`LocalParticipant`] publishes, with
//!   serialized mutation and exact reference release (see [`participant`])
//!
//! ## Layering
//! ```text
//! host ──handles──> HandleRegistry ──Arc<T>──> ConnectOptionsBuilder ──> Connector (external)
//!                                  └─────────> LocalParticipant ───────> MediaEngine (external)
//! ```
//!
//! Signaling, ICE/DTLS, codecs and transport are handled by the
//! [`Connector`] and [`MediaEngine`] implementations the host plugs in.

pub mod connect;
pub mod error;
pub mod handle;
pub mod ice;
pub mod logging;
pub mod participant;
pub mod platform;
pub mod room;
pub mod settings;
pub mod stats;
pub mod track;

pub use connect::{ConnectOptions, ConnectOptionsBuilder};
pub use error::{EngineError, RoomError, RoomResult};
pub use handle::{Handle, HandleArena, HandleRegistry, HandleResolver};
pub use ice::{IceOptions, IceOptionsBuilder, IceServer, IceTransportPolicy};
pub use logging::setup_logging;
pub use participant::{
    LocalParticipant, MediaEngine, ParticipantEvent, ParticipantSid, ParticipantState, ParticipantTrackSet,
};
pub use platform::PlatformInfo;
pub use room::{Connector, Room, RoomDescriptor, RoomState};
pub use settings::{LoggingSettings, RoomSettings};
pub use stats::{LocalAudioTrackStats, LocalVideoTrackStats, StatsReport, TrackStats};
pub use track::{
    AudioOptions, LocalAudioTrack, LocalTrack, LocalVideoTrack, TrackId, TrackKind, VideoConstraints,
    VideoDimensions,
};

/// room-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
