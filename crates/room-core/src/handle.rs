//! Typed opaque handles and handle resolution
//!
//! Objects that cross the host boundary (local tracks, platform info) are
//! never referenced by address. The host holds a [`Handle`], a plain `u64`
//! tagged with the type it names, and native code turns it back into a
//! shared reference through a [`HandleResolver`].
//!
//! [`HandleArena`] is the resolver used in practice: objects are inserted
//! once, receive a fresh handle, and stay resolvable until removed. Handles
//! are never reused, so a stale handle always resolves to `None` instead of
//! silently naming a different object. The raw value `0` is never issued and
//! stands for "no object" at the boundary.
//!
//! ```rust
//! use std::sync::Arc;
//! use confab_room_core::{HandleArena, HandleResolver, LocalAudioTrack};
//!
//! let arena = HandleArena::new();
//! let track = Arc::new(LocalAudioTrack::new("mic"));
//! let handle = arena.insert(track.clone());
//!
//! let resolved = arena.resolve(handle).unwrap();
//! assert!(Arc::ptr_eq(&resolved, &track));
//!
//! arena.remove(handle);
//! assert!(arena.resolve(handle).is_none());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::trace;

use crate::platform::PlatformInfo;
use crate::track::{LocalAudioTrack, LocalVideoTrack};

/// Opaque identifier for an object of type `T` held in a [`HandleArena`]
pub struct Handle<T> {
    raw: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Wrap a raw handle value received from the host
    pub const fn from_raw(raw: u64) -> Self {
        Self { raw, _marker: PhantomData }
    }

    /// Raw value to hand back to the host
    pub const fn raw(&self) -> u64 {
        self.raw
    }

    /// Whether this is the null handle (`0`)
    pub const fn is_null(&self) -> bool {
        self.raw == 0
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.raw)
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Resolves handles into shared references
///
/// Resolution must be synchronous and must not have side effects beyond
/// cloning the `Arc` it returns.
pub trait HandleResolver<T> {
    /// Resolve `handle`, or `None` if it does not name a live object
    fn resolve(&self, handle: Handle<T>) -> Option<Arc<T>>;
}

/// Concurrent arena of objects addressable by [`Handle`]
pub struct HandleArena<T> {
    objects: DashMap<u64, Arc<T>>,
    next_handle: AtomicU64,
}

impl<T> HandleArena<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Store an object and return a fresh handle to it
    pub fn insert(&self, object: Arc<T>) -> Handle<T> {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.objects.insert(raw, object);
        trace!(handle = raw, "Handle issued");
        Handle::from_raw(raw)
    }

    /// Forget a handle, returning the arena's reference to the object
    ///
    /// Other owners of the object are unaffected.
    pub fn remove(&self, handle: Handle<T>) -> Option<Arc<T>> {
        let removed = self.objects.remove(&handle.raw).map(|(_, object)| object);
        if removed.is_some() {
            trace!(handle = handle.raw, "Handle released");
        }
        removed
    }

    /// Whether `handle` currently names a live object
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.objects.contains_key(&handle.raw)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleResolver<T> for HandleArena<T> {
    fn resolve(&self, handle: Handle<T>) -> Option<Arc<T>> {
        self.objects.get(&handle.raw).map(|entry| Arc::clone(entry.value()))
    }
}

/// The handle arenas for every object type that crosses the host boundary
#[derive(Default)]
pub struct HandleRegistry {
    audio_tracks: HandleArena<LocalAudioTrack>,
    video_tracks: HandleArena<LocalVideoTrack>,
    platform_infos: HandleArena<PlatformInfo>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena of local audio tracks
    pub fn audio_tracks(&self) -> &HandleArena<LocalAudioTrack> {
        &self.audio_tracks
    }

    /// Arena of local video tracks
    pub fn video_tracks(&self) -> &HandleArena<LocalVideoTrack> {
        &self.video_tracks
    }

    /// Arena of platform info objects
    pub fn platform_infos(&self) -> &HandleArena<PlatformInfo> {
        &self.platform_infos
    }
}

impl HandleResolver<LocalAudioTrack> for HandleRegistry {
    fn resolve(&self, handle: Handle<LocalAudioTrack>) -> Option<Arc<LocalAudioTrack>> {
        self.audio_tracks.resolve(handle)
    }
}

impl HandleResolver<LocalVideoTrack> for HandleRegistry {
    fn resolve(&self, handle: Handle<LocalVideoTrack>) -> Option<Arc<LocalVideoTrack>> {
        self.video_tracks.resolve(handle)
    }
}

impl HandleResolver<PlatformInfo> for HandleRegistry {
    fn resolve(&self, handle: Handle<PlatformInfo>) -> Option<Arc<PlatformInfo>> {
        self.platform_infos.resolve(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_never_reused() {
        let arena = HandleArena::new();
        let first = arena.insert(Arc::new(LocalAudioTrack::new("a")));
        arena.remove(first);
        let second = arena.insert(Arc::new(LocalAudioTrack::new("b")));

        assert_ne!(first, second);
        assert!(arena.resolve(first).is_none());
        assert!(arena.resolve(second).is_some());
    }

    #[test]
    fn test_null_handle_never_resolves() {
        let arena: HandleArena<LocalVideoTrack> = HandleArena::new();
        arena.insert(Arc::new(LocalVideoTrack::new("cam")));

        let null = Handle::from_raw(0);
        assert!(null.is_null());
        assert!(arena.resolve(null).is_none());
    }

    #[test]
    fn test_resolve_acquires_reference() {
        let arena = HandleArena::new();
        let track = Arc::new(LocalAudioTrack::new("mic"));
        let handle = arena.insert(track.clone());
        assert_eq!(Arc::strong_count(&track), 2);

        let resolved = arena.resolve(handle).unwrap();
        assert_eq!(Arc::strong_count(&track), 3);
        drop(resolved);

        let removed = arena.remove(handle).unwrap();
        drop(removed);
        assert_eq!(Arc::strong_count(&track), 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_registry_resolves_by_type() {
        let registry = HandleRegistry::new();
        let audio = registry.audio_tracks().insert(Arc::new(LocalAudioTrack::new("mic")));
        let video = registry.video_tracks().insert(Arc::new(LocalVideoTrack::new("cam")));

        let audio_track: Option<Arc<LocalAudioTrack>> = registry.resolve(audio);
        let video_track: Option<Arc<LocalVideoTrack>> = registry.resolve(video);
        assert_eq!(audio_track.unwrap().name(), "mic");
        assert_eq!(video_track.unwrap().name(), "cam");
        assert_eq!(registry.audio_tracks().len(), 1);
        assert_eq!(registry.video_tracks().len(), 1);
    }
}
