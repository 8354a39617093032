//! Local media tracks
//!
//! A local track wraps a captured audio or video source owned by the media
//! engine. Tracks are shared as `Arc`s between the host, pending
//! [`ConnectOptions`](crate::ConnectOptions) and the
//! [`LocalParticipant`](crate::LocalParticipant) that publishes them; the
//! native resource lives until the last `Arc` is dropped.
//!
//! Identity is the [`TrackId`] assigned at creation. Two `Arc`s to the same
//! track always compare equal in a participant's track set.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RoomError, RoomResult};

/// Unique identifier of a local track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Generate a new random track id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Audio processing applied to a captured audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOptions {
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
    pub high_pass_filter: bool,
    pub typing_detection: bool,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            auto_gain_control: true,
            noise_suppression: true,
            high_pass_filter: true,
            typing_detection: false,
        }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 640x480
    pub const VGA: VideoDimensions = VideoDimensions::new(640, 480);
    /// 1280x720
    pub const HD_720P: VideoDimensions = VideoDimensions::new(1280, 720);
}

impl fmt::Display for VideoDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Capture constraints for a local video track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub min_dimensions: VideoDimensions,
    pub max_dimensions: VideoDimensions,
    pub min_fps: u32,
    pub max_fps: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            min_dimensions: VideoDimensions::new(0, 0),
            max_dimensions: VideoDimensions::HD_720P,
            min_fps: 0,
            max_fps: 30,
        }
    }
}

impl VideoConstraints {
    /// Check that every minimum is within its maximum and a frame rate is allowed
    pub fn validate(&self) -> RoomResult<()> {
        if self.min_dimensions.width > self.max_dimensions.width
            || self.min_dimensions.height > self.max_dimensions.height
        {
            return Err(RoomError::invalid_track_options(format!(
                "min dimensions {} exceed max dimensions {}",
                self.min_dimensions, self.max_dimensions
            )));
        }
        if self.max_fps == 0 {
            return Err(RoomError::invalid_track_options("max fps must be greater than zero"));
        }
        if self.min_fps > self.max_fps {
            return Err(RoomError::invalid_track_options(format!(
                "min fps {} exceeds max fps {}",
                self.min_fps, self.max_fps
            )));
        }
        Ok(())
    }
}

/// A locally captured audio track
#[derive(Debug)]
pub struct LocalAudioTrack {
    id: TrackId,
    name: String,
    options: AudioOptions,
    enabled: AtomicBool,
}

impl LocalAudioTrack {
    /// Create an enabled audio track with default processing
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, AudioOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: AudioOptions) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            options,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &AudioOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or mute the track. Returns the previous state.
    ///
    /// Muting does not unpublish the track.
    pub fn enable(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            debug!(track = %self.id, enabled, "Audio track enabled state changed");
        }
        previous
    }
}

/// A locally captured video track
#[derive(Debug)]
pub struct LocalVideoTrack {
    id: TrackId,
    name: String,
    constraints: VideoConstraints,
    enabled: AtomicBool,
}

impl LocalVideoTrack {
    /// Create an enabled video track with default constraints
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            constraints: VideoConstraints::default(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a video track, rejecting inconsistent constraints
    pub fn with_constraints(name: impl Into<String>, constraints: VideoConstraints) -> RoomResult<Self> {
        constraints.validate()?;
        Ok(Self {
            id: TrackId::new(),
            name: name.into(),
            constraints,
            enabled: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraints(&self) -> &VideoConstraints {
        &self.constraints
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or pause the track. Returns the previous state.
    pub fn enable(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            debug!(track = %self.id, enabled, "Video track enabled state changed");
        }
        previous
    }
}

/// Shared reference to either kind of local track
#[derive(Debug, Clone)]
pub enum LocalTrack {
    Audio(Arc<LocalAudioTrack>),
    Video(Arc<LocalVideoTrack>),
}

impl LocalTrack {
    pub fn id(&self) -> TrackId {
        match self {
            LocalTrack::Audio(track) => track.id(),
            LocalTrack::Video(track) => track.id(),
        }
    }

    pub fn kind(&self) -> TrackKind {
        match self {
            LocalTrack::Audio(_) => TrackKind::Audio,
            LocalTrack::Video(_) => TrackKind::Video,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LocalTrack::Audio(track) => track.name(),
            LocalTrack::Video(track) => track.name(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            LocalTrack::Audio(track) => track.is_enabled(),
            LocalTrack::Video(track) => track.is_enabled(),
        }
    }

    pub fn as_audio(&self) -> Option<&Arc<LocalAudioTrack>> {
        match self {
            LocalTrack::Audio(track) => Some(track),
            LocalTrack::Video(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&Arc<LocalVideoTrack>> {
        match self {
            LocalTrack::Video(track) => Some(track),
            LocalTrack::Audio(_) => None,
        }
    }
}

impl PartialEq for LocalTrack {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

impl Eq for LocalTrack {}

impl From<Arc<LocalAudioTrack>> for LocalTrack {
    fn from(track: Arc<LocalAudioTrack>) -> Self {
        LocalTrack::Audio(track)
    }
}

impl From<Arc<LocalVideoTrack>> for LocalTrack {
    fn from(track: Arc<LocalVideoTrack>) -> Self {
        LocalTrack::Video(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_have_distinct_ids() {
        let a = LocalAudioTrack::new("mic");
        let b = LocalAudioTrack::new("mic");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_enable_returns_previous_state() {
        let track = LocalAudioTrack::new("mic");
        assert!(track.is_enabled());
        assert!(track.enable(false));
        assert!(!track.is_enabled());
        assert!(!track.enable(false));
    }

    #[test]
    fn test_video_constraints_validation() {
        let bad_dimensions = VideoConstraints {
            min_dimensions: VideoDimensions::HD_720P,
            max_dimensions: VideoDimensions::VGA,
            ..Default::default()
        };
        assert!(matches!(
            LocalVideoTrack::with_constraints("cam", bad_dimensions),
            Err(RoomError::InvalidTrackOptions { .. })
        ));

        let bad_fps = VideoConstraints { min_fps: 30, max_fps: 15, ..Default::default() };
        assert!(bad_fps.validate().is_err());

        let zero_fps = VideoConstraints { max_fps: 0, ..Default::default() };
        assert!(zero_fps.validate().is_err());

        let track = LocalVideoTrack::with_constraints("cam", VideoConstraints::default()).unwrap();
        assert_eq!(track.constraints().max_fps, 30);
    }

    #[test]
    fn test_local_track_equality_is_identity() {
        let track = Arc::new(LocalVideoTrack::new("cam"));
        let a = LocalTrack::from(track.clone());
        let b = LocalTrack::from(track);
        let c = LocalTrack::from(Arc::new(LocalVideoTrack::new("cam")));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.kind(), TrackKind::Video);
        assert!(a.as_audio().is_none());
    }
}
