//! Local participant and its published track set
//!
//! A [`LocalParticipant`] owns the authoritative set of tracks it currently
//! publishes. Every change goes through `add_*`/`remove_*`, which ask the
//! [`MediaEngine`] to renegotiate before reporting success:
//!
//! | call                       | track state     | engine called | result              |
//! |----------------------------|-----------------|---------------|---------------------|
//! | `add_track`                | not published   | `publish`     | `Ok(true)` / `Err`  |
//! | `add_track`                | published       | no            | `Ok(false)`         |
//! | `remove_track`             | published       | `unpublish`   | `Ok(true)` / `Err`  |
//! | `remove_track`             | not published   | no            | `Ok(false)`         |
//! | any mutation after release | -               | no            | `Err(Released)`     |
//!
//! An engine rejection is returned as [`RoomError::Engine`] with the engine's
//! error untouched, and the set is left as it was.
//!
//! # Concurrency
//!
//! The set is guarded by a read-write lock. Mutations hold the write lock for
//! the whole operation, engine call included, so mutations on one participant
//! are serialized. Readers copy a snapshot under the read lock and never see
//! a half-applied change.
//!
//! # Release
//!
//! [`LocalParticipant::release`] is terminal. It drops exactly one reference
//! per published track and moves the participant to
//! [`ParticipantState::Released`]. Tracks themselves stay alive as long as
//! anyone else holds them.
//!
//! ```rust
//! use std::sync::Arc;
//! use confab_room_core::{
//!     EngineError, LocalAudioTrack, LocalParticipant, LocalTrack, MediaEngine, ParticipantSid,
//! };
//!
//! struct AcceptAll;
//!
//! impl MediaEngine for AcceptAll {
//!     fn publish_track(&self, _: &ParticipantSid, _: &LocalTrack) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!     fn unpublish_track(&self, _: &ParticipantSid, _: &LocalTrack) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//! }
//!
//! let participant = LocalParticipant::new(ParticipantSid::generate(), "alice", Arc::new(AcceptAll));
//! let mic = Arc::new(LocalAudioTrack::new("mic"));
//!
//! assert!(participant.add_audio_track(&mic).unwrap());
//! assert!(!participant.add_audio_track(&mic).unwrap());
//! assert_eq!(participant.track_count(), 1);
//!
//! assert_eq!(participant.release().unwrap(), 1);
//! assert!(participant.add_audio_track(&mic).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, RoomError, RoomResult};
use crate::handle::{Handle, HandleResolver};
use crate::stats::{StatsReport, TrackStats};
use crate::track::{LocalAudioTrack, LocalTrack, LocalVideoTrack, TrackId, TrackKind};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Server-assigned participant identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantSid(String);

impl ParticipantSid {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    /// Generate a local placeholder sid (`PA` followed by 32 hex digits)
    pub fn generate() -> Self {
        Self(format!("PA{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Renegotiation interface of the media engine
///
/// `publish_track` and `unpublish_track` are call-and-wait: they return once
/// the engine has accepted or rejected the change.
///
/// Both run while the participant's track set is write-locked. They must not
/// call back into the same [`LocalParticipant`], not even its read methods;
/// the lock is not reentrant and such a call deadlocks. `track_stats` runs
/// with the lock released and may read the participant.
pub trait MediaEngine: Send + Sync {
    fn publish_track(&self, participant: &ParticipantSid, track: &LocalTrack) -> Result<(), EngineError>;

    fn unpublish_track(&self, participant: &ParticipantSid, track: &LocalTrack) -> Result<(), EngineError>;

    /// Current statistics for a published track, if the engine has any
    fn track_stats(&self, _participant: &ParticipantSid, _track: &LocalTrack) -> Option<TrackStats> {
        None
    }
}

/// Lifecycle state of a participant's track registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Accepting add/remove
    Active,
    /// Terminal; every mutation is rejected
    Released,
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantState::Active => write!(f, "active"),
            ParticipantState::Released => write!(f, "released"),
        }
    }
}

/// Notifications emitted after a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantEvent {
    TrackPublished {
        participant: ParticipantSid,
        track_id: TrackId,
        kind: TrackKind,
    },
    TrackUnpublished {
        participant: ParticipantSid,
        track_id: TrackId,
        kind: TrackKind,
    },
    Released {
        participant: ParticipantSid,
        tracks_released: usize,
    },
}

/// Published tracks of one participant, in publish order, without duplicates
#[derive(Debug, Default)]
pub struct ParticipantTrackSet {
    tracks: Vec<LocalTrack>,
}

impl ParticipantTrackSet {
    fn contains(&self, id: TrackId) -> bool {
        self.tracks.iter().any(|t| t.id() == id)
    }

    /// Insert unless present. Returns whether the track was inserted.
    fn insert(&mut self, track: LocalTrack) -> bool {
        if self.contains(track.id()) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    fn remove(&mut self, id: TrackId) -> Option<LocalTrack> {
        let index = self.tracks.iter().position(|t| t.id() == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalTrack> {
        self.tracks.iter()
    }
}

/// The local participant of a room
pub struct LocalParticipant {
    sid: ParticipantSid,
    identity: String,
    engine: Arc<dyn MediaEngine>,
    /// `None` once released
    tracks: RwLock<Option<ParticipantTrackSet>>,
    event_tx: broadcast::Sender<ParticipantEvent>,
}

impl LocalParticipant {
    /// Create an active participant with no published tracks
    pub fn new(sid: ParticipantSid, identity: impl Into<String>, engine: Arc<dyn MediaEngine>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sid,
            identity: identity.into(),
            engine,
            tracks: RwLock::new(Some(ParticipantTrackSet::default())),
            event_tx,
        }
    }

    /// Create a participant whose tracks were already published by the engine,
    /// e.g. as part of connecting. Duplicates are collapsed.
    pub fn with_published_tracks<I>(
        sid: ParticipantSid,
        identity: impl Into<String>,
        engine: Arc<dyn MediaEngine>,
        tracks: I,
    ) -> Self
    where
        I: IntoIterator<Item = LocalTrack>,
    {
        let participant = Self::new(sid, identity, engine);
        {
            let mut guard = participant.tracks.write();
            if let Some(set) = guard.as_mut() {
                for track in tracks {
                    set.insert(track);
                }
            }
        }
        participant
    }

    pub fn sid(&self) -> &ParticipantSid {
        &self.sid
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> ParticipantState {
        if self.tracks.read().is_some() {
            ParticipantState::Active
        } else {
            ParticipantState::Released
        }
    }

    pub fn is_released(&self) -> bool {
        self.state() == ParticipantState::Released
    }

    /// Subscribe to publish/unpublish/release notifications
    pub fn subscribe_events(&self) -> broadcast::Receiver<ParticipantEvent> {
        self.event_tx.subscribe()
    }

    /// Publish a track. `Ok(false)` if it is already published.
    pub fn add_track(&self, track: impl Into<LocalTrack>) -> RoomResult<bool> {
        let track = track.into();
        let (track_id, kind) = (track.id(), track.kind());

        let mut guard = self.tracks.write();
        let Some(set) = guard.as_mut() else {
            return Err(self.released_error("add_track"));
        };

        if set.contains(track_id) {
            debug!(participant = %self.sid, track = %track_id, "Track already published");
            return Ok(false);
        }

        if let Err(e) = self.engine.publish_track(&self.sid, &track) {
            warn!(participant = %self.sid, track = %track_id, error = %e, "Media engine rejected publish");
            return Err(e.into());
        }

        set.insert(track);
        drop(guard);

        info!(participant = %self.sid, track = %track_id, %kind, "Published track");
        self.emit(ParticipantEvent::TrackPublished {
            participant: self.sid.clone(),
            track_id,
            kind,
        });
        Ok(true)
    }

    /// Unpublish a track. `Ok(false)` if it was not published.
    ///
    /// Only the participant's reference is dropped; the track stays alive for
    /// its other owners.
    pub fn remove_track(&self, track: &LocalTrack) -> RoomResult<bool> {
        let (track_id, kind) = (track.id(), track.kind());

        let mut guard = self.tracks.write();
        let Some(set) = guard.as_mut() else {
            return Err(self.released_error("remove_track"));
        };

        if !set.contains(track_id) {
            debug!(participant = %self.sid, track = %track_id, "Track not published");
            return Ok(false);
        }

        if let Err(e) = self.engine.unpublish_track(&self.sid, track) {
            warn!(participant = %self.sid, track = %track_id, error = %e, "Media engine rejected unpublish");
            return Err(e.into());
        }

        let removed = set.remove(track_id);
        drop(guard);
        drop(removed);

        info!(participant = %self.sid, track = %track_id, %kind, "Unpublished track");
        self.emit(ParticipantEvent::TrackUnpublished {
            participant: self.sid.clone(),
            track_id,
            kind,
        });
        Ok(true)
    }

    pub fn add_audio_track(&self, track: &Arc<LocalAudioTrack>) -> RoomResult<bool> {
        self.add_track(LocalTrack::Audio(Arc::clone(track)))
    }

    pub fn add_video_track(&self, track: &Arc<LocalVideoTrack>) -> RoomResult<bool> {
        self.add_track(LocalTrack::Video(Arc::clone(track)))
    }

    pub fn remove_audio_track(&self, track: &Arc<LocalAudioTrack>) -> RoomResult<bool> {
        self.remove_track(&LocalTrack::Audio(Arc::clone(track)))
    }

    pub fn remove_video_track(&self, track: &Arc<LocalVideoTrack>) -> RoomResult<bool> {
        self.remove_track(&LocalTrack::Video(Arc::clone(track)))
    }

    /// Resolve a host audio track handle and publish it
    pub fn add_audio_track_handle<R>(&self, resolver: &R, handle: Handle<LocalAudioTrack>) -> RoomResult<bool>
    where
        R: HandleResolver<LocalAudioTrack>,
    {
        let track = resolve_one(resolver, "audio track", handle)?;
        self.add_audio_track(&track)
    }

    /// Resolve a host video track handle and publish it
    pub fn add_video_track_handle<R>(&self, resolver: &R, handle: Handle<LocalVideoTrack>) -> RoomResult<bool>
    where
        R: HandleResolver<LocalVideoTrack>,
    {
        let track = resolve_one(resolver, "video track", handle)?;
        self.add_video_track(&track)
    }

    /// Resolve a host audio track handle and unpublish it
    pub fn remove_audio_track_handle<R>(&self, resolver: &R, handle: Handle<LocalAudioTrack>) -> RoomResult<bool>
    where
        R: HandleResolver<LocalAudioTrack>,
    {
        let track = resolve_one(resolver, "audio track", handle)?;
        self.remove_audio_track(&track)
    }

    /// Resolve a host video track handle and unpublish it
    pub fn remove_video_track_handle<R>(&self, resolver: &R, handle: Handle<LocalVideoTrack>) -> RoomResult<bool>
    where
        R: HandleResolver<LocalVideoTrack>,
    {
        let track = resolve_one(resolver, "video track", handle)?;
        self.remove_video_track(&track)
    }

    /// Tear down the track set. Returns how many track references were dropped.
    ///
    /// Every later mutation, and a second release, fails with `Released`.
    pub fn release(&self) -> RoomResult<usize> {
        let Some(set) = self.tracks.write().take() else {
            return Err(self.released_error("release"));
        };

        let tracks_released = set.len();
        drop(set);

        info!(participant = %self.sid, tracks_released, "Released local participant");
        self.emit(ParticipantEvent::Released {
            participant: self.sid.clone(),
            tracks_released,
        });
        Ok(tracks_released)
    }

    /// Snapshot of published tracks in publish order. Empty after release.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.tracks
            .read()
            .as_ref()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of published audio tracks
    pub fn audio_tracks(&self) -> Vec<Arc<LocalAudioTrack>> {
        self.tracks
            .read()
            .as_ref()
            .map(|set| set.iter().filter_map(|t| t.as_audio().cloned()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of published video tracks
    pub fn video_tracks(&self) -> Vec<Arc<LocalVideoTrack>> {
        self.tracks
            .read()
            .as_ref()
            .map(|set| set.iter().filter_map(|t| t.as_video().cloned()).collect())
            .unwrap_or_default()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.read().as_ref().map_or(0, ParticipantTrackSet::len)
    }

    pub fn is_published(&self, id: TrackId) -> bool {
        self.tracks.read().as_ref().is_some_and(|set| set.contains(id))
    }

    /// Collect engine statistics for every published track
    pub fn stats(&self) -> RoomResult<StatsReport> {
        let tracks = {
            let guard = self.tracks.read();
            let Some(set) = guard.as_ref() else {
                return Err(self.released_error("stats"));
            };
            set.iter().cloned().collect::<Vec<_>>()
        };

        let mut report = StatsReport::new(self.sid.clone());
        for track in &tracks {
            if let Some(stats) = self.engine.track_stats(&self.sid, track) {
                report.push(stats);
            }
        }
        Ok(report)
    }

    fn released_error(&self, operation: &str) -> RoomError {
        warn!(participant = %self.sid, operation, "Operation on released participant");
        RoomError::released(&self.sid)
    }

    fn emit(&self, event: ParticipantEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

impl fmt::Debug for LocalParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalParticipant")
            .field("sid", &self.sid)
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("tracks", &self.track_count())
            .finish()
    }
}

fn resolve_one<T, R>(resolver: &R, kind: &'static str, handle: Handle<T>) -> RoomResult<Arc<T>>
where
    R: HandleResolver<T>,
{
    resolver
        .resolve(handle)
        .ok_or_else(|| RoomError::dangling_handle(kind, 0, handle.raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleRegistry;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<(&'static str, TrackId)>>,
        reject_publish: Mutex<bool>,
    }

    impl MediaEngine for RecordingEngine {
        fn publish_track(&self, _: &ParticipantSid, track: &LocalTrack) -> Result<(), EngineError> {
            if *self.reject_publish.lock() {
                return Err(EngineError::publish("no free transceiver"));
            }
            self.calls.lock().push(("publish", track.id()));
            Ok(())
        }

        fn unpublish_track(&self, _: &ParticipantSid, track: &LocalTrack) -> Result<(), EngineError> {
            self.calls.lock().push(("unpublish", track.id()));
            Ok(())
        }
    }

    fn participant() -> (LocalParticipant, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        let participant = LocalParticipant::new(ParticipantSid::new("PA1"), "alice", engine.clone());
        (participant, engine)
    }

    #[test]
    fn test_add_is_idempotent_and_calls_engine_once() {
        let (participant, engine) = participant();
        let mic = Arc::new(LocalAudioTrack::new("mic"));

        assert!(participant.add_audio_track(&mic).unwrap());
        assert!(!participant.add_audio_track(&mic).unwrap());
        assert_eq!(participant.track_count(), 1);
        assert_eq!(engine.calls.lock().as_slice(), &[("publish", mic.id())]);
    }

    #[test]
    fn test_remove_absent_returns_false_without_engine() {
        let (participant, engine) = participant();
        let cam = Arc::new(LocalVideoTrack::new("cam"));

        assert!(!participant.remove_video_track(&cam).unwrap());
        assert!(engine.calls.lock().is_empty());
    }

    #[test]
    fn test_remove_keeps_track_alive_for_other_owners() {
        let (participant, _engine) = participant();
        let cam = Arc::new(LocalVideoTrack::new("cam"));

        participant.add_video_track(&cam).unwrap();
        assert_eq!(Arc::strong_count(&cam), 2);

        assert!(participant.remove_video_track(&cam).unwrap());
        assert_eq!(Arc::strong_count(&cam), 1);
        assert!(!participant.is_published(cam.id()));
    }

    #[test]
    fn test_engine_rejection_is_propagated_and_set_unchanged() {
        let (participant, engine) = participant();
        *engine.reject_publish.lock() = true;
        let mic = Arc::new(LocalAudioTrack::new("mic"));

        let err = participant.add_audio_track(&mic).unwrap_err();
        assert_eq!(err, RoomError::Engine(EngineError::publish("no free transceiver")));
        assert_eq!(participant.track_count(), 0);
        assert_eq!(Arc::strong_count(&mic), 1);
    }

    #[test]
    fn test_release_drops_every_reference_once() {
        let (participant, _engine) = participant();
        let mic = Arc::new(LocalAudioTrack::new("mic"));
        let cam = Arc::new(LocalVideoTrack::new("cam"));
        participant.add_audio_track(&mic).unwrap();
        participant.add_video_track(&cam).unwrap();

        assert_eq!(participant.release().unwrap(), 2);
        assert_eq!(Arc::strong_count(&mic), 1);
        assert_eq!(Arc::strong_count(&cam), 1);
        assert_eq!(participant.state(), ParticipantState::Released);
        assert!(participant.tracks().is_empty());
    }

    #[test]
    fn test_operations_after_release_fail_fast() {
        let (participant, engine) = participant();
        let mic = Arc::new(LocalAudioTrack::new("mic"));
        participant.release().unwrap();

        assert!(matches!(participant.add_audio_track(&mic), Err(RoomError::Released { .. })));
        assert!(matches!(participant.remove_audio_track(&mic), Err(RoomError::Released { .. })));
        assert!(matches!(participant.release(), Err(RoomError::Released { .. })));
        assert!(matches!(participant.stats(), Err(RoomError::Released { .. })));
        assert!(engine.calls.lock().is_empty());
        assert_eq!(Arc::strong_count(&mic), 1);
    }

    #[test]
    fn test_handle_operations() {
        let (participant, _engine) = participant();
        let handles = HandleRegistry::new();
        let mic = Arc::new(LocalAudioTrack::new("mic"));
        let handle = handles.audio_tracks().insert(mic.clone());

        assert!(participant.add_audio_track_handle(&handles, handle).unwrap());
        assert!(participant.is_published(mic.id()));
        assert!(participant.remove_audio_track_handle(&handles, handle).unwrap());

        handles.audio_tracks().remove(handle);
        let err = participant.add_audio_track_handle(&handles, handle).unwrap_err();
        assert_eq!(err, RoomError::dangling_handle("audio track", 0, handle.raw()));
    }

    #[test]
    fn test_snapshots_preserve_publish_order() {
        let (participant, _engine) = participant();
        let cam = Arc::new(LocalVideoTrack::new("cam"));
        let mic = Arc::new(LocalAudioTrack::new("mic"));
        let screen = Arc::new(LocalVideoTrack::new("screen"));

        participant.add_video_track(&cam).unwrap();
        participant.add_audio_track(&mic).unwrap();
        participant.add_video_track(&screen).unwrap();

        let names: Vec<String> = participant.tracks().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["cam", "mic", "screen"]);
        assert_eq!(participant.video_tracks().len(), 2);
        assert_eq!(participant.audio_tracks()[0].id(), mic.id());
    }

    #[test]
    fn test_with_published_tracks_collapses_duplicates() {
        let engine = Arc::new(RecordingEngine::default());
        let mic = Arc::new(LocalAudioTrack::new("mic"));
        let participant = LocalParticipant::with_published_tracks(
            ParticipantSid::generate(),
            "bob",
            engine.clone(),
            vec![LocalTrack::from(mic.clone()), LocalTrack::from(mic.clone())],
        );

        assert_eq!(participant.track_count(), 1);
        assert!(engine.calls.lock().is_empty());
    }

    #[test]
    fn test_events_follow_mutations() {
        let (participant, _engine) = participant();
        let mut events = participant.subscribe_events();
        let mic = Arc::new(LocalAudioTrack::new("mic"));

        participant.add_audio_track(&mic).unwrap();
        participant.add_audio_track(&mic).unwrap();
        participant.remove_audio_track(&mic).unwrap();
        participant.release().unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            ParticipantEvent::TrackPublished {
                participant: ParticipantSid::new("PA1"),
                track_id: mic.id(),
                kind: TrackKind::Audio,
            }
        );
        assert!(matches!(events.try_recv().unwrap(), ParticipantEvent::TrackUnpublished { .. }));
        assert!(matches!(
            events.try_recv().unwrap(),
            ParticipantEvent::Released { tracks_released: 0, .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_generated_sid_format() {
        let sid = ParticipantSid::generate();
        assert!(sid.as_str().starts_with("PA"));
        assert_eq!(sid.as_str().len(), 34);
    }
}
