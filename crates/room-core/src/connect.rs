//! Connection options assembly
//!
//! The host supplies connection parameters piecemeal: an access token, and
//! then any of a room name, lists of track handles, ICE options, a platform
//! info handle and the insights flag. [`ConnectOptionsBuilder`] collects
//! them and [`ConnectOptionsBuilder::build`] turns them into one immutable
//! [`ConnectOptions`] in a single step:
//!
//! 1. The access token is validated (`InvalidArgument` on failure).
//! 2. Every audio and video track handle is resolved, in order. The first
//!    handle that does not resolve fails the whole build with
//!    `DanglingHandle` carrying its index. Track lists are never truncated.
//! 3. The platform info handle, if given, is resolved and kept as a weak
//!    reference.
//!
//! Either a complete `ConnectOptions` is returned or nothing is: references
//! acquired before a failure are dropped before `build` returns.
//!
//! A track list that was never supplied and one supplied empty both produce
//! an empty track sequence.
//!
//! ```rust
//! use std::sync::Arc;
//! use confab_room_core::{ConnectOptionsBuilder, HandleRegistry, LocalAudioTrack, LocalVideoTrack};
//!
//! let handles = HandleRegistry::new();
//! let mic = handles.audio_tracks().insert(Arc::new(LocalAudioTrack::new("mic")));
//! let cam = handles.video_tracks().insert(Arc::new(LocalVideoTrack::new("cam")));
//!
//! let options = ConnectOptionsBuilder::new("eyJhbGciOi.token.sig")
//!     .room_name("standup")
//!     .audio_tracks([mic])
//!     .video_tracks([cam])
//!     .enable_insights(false)
//!     .build(&handles)
//!     .unwrap();
//!
//! assert_eq!(options.room_name(), Some("standup"));
//! assert_eq!(options.audio_tracks()[0].name(), "mic");
//! assert!(!options.insights_enabled());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::error::{RoomError, RoomResult};
use crate::handle::{Handle, HandleResolver};
use crate::ice::IceOptions;
use crate::platform::PlatformInfo;
use crate::settings::RoomSettings;
use crate::track::{LocalAudioTrack, LocalVideoTrack};

/// Immutable options for a single connection attempt
#[derive(Clone)]
pub struct ConnectOptions {
    access_token: String,
    room_name: Option<String>,
    audio_tracks: Vec<Arc<LocalAudioTrack>>,
    video_tracks: Vec<Arc<LocalVideoTrack>>,
    ice_options: Option<IceOptions>,
    platform_info: Option<Weak<PlatformInfo>>,
    insights_enabled: bool,
}

impl ConnectOptions {
    /// Start building options for `access_token`
    pub fn builder(access_token: impl Into<String>) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new(access_token)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Room to join, `None` if the server should pick one from the token
    pub fn room_name(&self) -> Option<&str> {
        self.room_name.as_deref()
    }

    /// Audio tracks to publish on connect, in caller order
    pub fn audio_tracks(&self) -> &[Arc<LocalAudioTrack>] {
        &self.audio_tracks
    }

    /// Video tracks to publish on connect, in caller order
    pub fn video_tracks(&self) -> &[Arc<LocalVideoTrack>] {
        &self.video_tracks
    }

    pub fn ice_options(&self) -> Option<&IceOptions> {
        self.ice_options.as_ref()
    }

    /// Platform info, if it was supplied and is still alive
    pub fn platform_info(&self) -> Option<Arc<PlatformInfo>> {
        self.platform_info.as_ref().and_then(Weak::upgrade)
    }

    /// Whether platform info was supplied at build time
    pub fn has_platform_info(&self) -> bool {
        self.platform_info.is_some()
    }

    pub fn insights_enabled(&self) -> bool {
        self.insights_enabled
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("access_token", &"<redacted>")
            .field("room_name", &self.room_name)
            .field("audio_tracks", &self.audio_tracks.len())
            .field("video_tracks", &self.video_tracks.len())
            .field("ice_options", &self.ice_options)
            .field("platform_info", &self.has_platform_info())
            .field("insights_enabled", &self.insights_enabled)
            .finish()
    }
}

/// Collects optional connection inputs; consumed by [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct ConnectOptionsBuilder {
    access_token: String,
    room_name: Option<String>,
    audio_track_handles: Option<Vec<Handle<LocalAudioTrack>>>,
    video_track_handles: Option<Vec<Handle<LocalVideoTrack>>>,
    ice_options: Option<IceOptions>,
    platform_info_handle: Option<Handle<PlatformInfo>>,
    insights_enabled: bool,
}

impl ConnectOptionsBuilder {
    /// Create a builder. Insights are enabled unless turned off.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            room_name: None,
            audio_track_handles: None,
            video_track_handles: None,
            ice_options: None,
            platform_info_handle: None,
            insights_enabled: true,
        }
    }

    /// Create a builder seeded with the caller's defaults
    pub fn from_settings(access_token: impl Into<String>, settings: &RoomSettings) -> Self {
        let mut builder = Self::new(access_token).enable_insights(settings.insights_enabled);
        builder.ice_options = settings.ice.clone();
        builder
    }

    pub fn room_name(mut self, room_name: impl Into<String>) -> Self {
        self.room_name = Some(room_name.into());
        self
    }

    /// Audio tracks to publish on connect
    pub fn audio_tracks<I>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = Handle<LocalAudioTrack>>,
    {
        self.audio_track_handles = Some(handles.into_iter().collect());
        self
    }

    /// Video tracks to publish on connect
    pub fn video_tracks<I>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = Handle<LocalVideoTrack>>,
    {
        self.video_track_handles = Some(handles.into_iter().collect());
        self
    }

    pub fn ice_options(mut self, ice_options: IceOptions) -> Self {
        self.ice_options = Some(ice_options);
        self
    }

    /// Platform info handle. The null handle means introspection was not performed.
    pub fn platform_info(mut self, handle: Handle<PlatformInfo>) -> Self {
        self.platform_info_handle = if handle.is_null() { None } else { Some(handle) };
        self
    }

    pub fn enable_insights(mut self, enabled: bool) -> Self {
        self.insights_enabled = enabled;
        self
    }

    /// Resolve every handle and produce the options
    pub fn build<R>(self, resolver: &R) -> RoomResult<ConnectOptions>
    where
        R: HandleResolver<LocalAudioTrack> + HandleResolver<LocalVideoTrack> + HandleResolver<PlatformInfo>,
    {
        validate_access_token(&self.access_token)?;

        let audio_tracks = resolve_all::<LocalAudioTrack, R>("audio track", self.audio_track_handles, resolver)?;
        let video_tracks = resolve_all::<LocalVideoTrack, R>("video track", self.video_track_handles, resolver)?;

        let platform_info = match self.platform_info_handle {
            Some(handle) => {
                let info = HandleResolver::<PlatformInfo>::resolve(resolver, handle)
                    .ok_or_else(|| RoomError::dangling_handle("platform info", 0, handle.raw()))?;
                Some(Arc::downgrade(&info))
            }
            None => None,
        };

        debug!(
            room = ?self.room_name,
            audio_tracks = audio_tracks.len(),
            video_tracks = video_tracks.len(),
            ice_options = self.ice_options.is_some(),
            platform_info = platform_info.is_some(),
            insights = self.insights_enabled,
            "Built connect options"
        );

        Ok(ConnectOptions {
            access_token: self.access_token,
            room_name: self.room_name,
            audio_tracks,
            video_tracks,
            ice_options: self.ice_options,
            platform_info,
            insights_enabled: self.insights_enabled,
        })
    }
}

/// Reject tokens that cannot possibly be valid
fn validate_access_token(token: &str) -> RoomResult<()> {
    if token.trim().is_empty() {
        return Err(RoomError::invalid_argument("access_token", "must not be empty"));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RoomError::invalid_argument(
            "access_token",
            "must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

/// Resolve handles in order, failing on the first one that does not resolve
fn resolve_all<T, R>(
    kind: &'static str,
    handles: Option<Vec<Handle<T>>>,
    resolver: &R,
) -> RoomResult<Vec<Arc<T>>>
where
    R: HandleResolver<T>,
{
    let Some(handles) = handles else {
        return Ok(Vec::new());
    };

    handles
        .into_iter()
        .enumerate()
        .map(|(index, handle)| {
            resolver
                .resolve(handle)
                .ok_or_else(|| RoomError::dangling_handle(kind, index, handle.raw()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleRegistry;
    use crate::ice::{IceServer, IceTransportPolicy};

    const TOKEN: &str = "header.payload.signature";

    #[test]
    fn test_empty_token_is_invalid() {
        let handles = HandleRegistry::new();
        for token in ["", "   ", "abc def", "abc\n"] {
            let result = ConnectOptionsBuilder::new(token).build(&handles);
            assert!(
                matches!(result, Err(RoomError::InvalidArgument { ref field, .. }) if field == "access_token"),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_minimal_options() {
        let handles = HandleRegistry::new();
        let options = ConnectOptionsBuilder::new(TOKEN).build(&handles).unwrap();

        assert_eq!(options.access_token(), TOKEN);
        assert_eq!(options.room_name(), None);
        assert!(options.audio_tracks().is_empty());
        assert!(options.video_tracks().is_empty());
        assert!(options.ice_options().is_none());
        assert!(options.platform_info().is_none());
        assert!(options.insights_enabled());
    }

    #[test]
    fn test_empty_room_name_is_distinct_from_absent() {
        let handles = HandleRegistry::new();
        let options = ConnectOptionsBuilder::new(TOKEN).room_name("").build(&handles).unwrap();
        assert_eq!(options.room_name(), Some(""));
    }

    #[test]
    fn test_dangling_video_handle_reports_index() {
        let handles = HandleRegistry::new();
        let cam = handles.video_tracks().insert(Arc::new(LocalVideoTrack::new("cam")));
        let stale = handles.video_tracks().insert(Arc::new(LocalVideoTrack::new("old")));
        handles.video_tracks().remove(stale);

        let result = ConnectOptionsBuilder::new(TOKEN)
            .video_tracks([cam, stale])
            .build(&handles);

        assert_eq!(
            result.unwrap_err(),
            RoomError::DanglingHandle { kind: "video track", index: 1, handle: stale.raw() }
        );
    }

    #[test]
    fn test_platform_info_is_weak() {
        let handles = HandleRegistry::new();
        let info = Arc::new(PlatformInfo::detect());
        let handle = handles.platform_infos().insert(info.clone());

        let options = ConnectOptionsBuilder::new(TOKEN).platform_info(handle).build(&handles).unwrap();
        assert_eq!(Arc::strong_count(&info), 2);
        assert_eq!(options.platform_info().unwrap().platform_name, info.platform_name);

        handles.platform_infos().remove(handle);
        drop(info);
        assert!(options.has_platform_info());
        assert!(options.platform_info().is_none());
    }

    #[test]
    fn test_null_platform_handle_is_absent() {
        let handles = HandleRegistry::new();
        let options = ConnectOptionsBuilder::new(TOKEN)
            .platform_info(Handle::from_raw(0))
            .build(&handles)
            .unwrap();
        assert!(!options.has_platform_info());
    }

    #[test]
    fn test_dangling_platform_handle_fails() {
        let handles = HandleRegistry::new();
        let result = ConnectOptionsBuilder::new(TOKEN)
            .platform_info(Handle::from_raw(42))
            .build(&handles);
        assert!(matches!(result, Err(RoomError::DanglingHandle { kind: "platform info", .. })));
    }

    #[test]
    fn test_from_settings() {
        let ice = IceOptions::builder()
            .server(IceServer::new(["stun:stun.example.com"]))
            .transport_policy(IceTransportPolicy::All)
            .build()
            .unwrap();
        let settings = RoomSettings::default().with_insights(false).with_ice(ice.clone());
        let handles = HandleRegistry::new();

        let options = ConnectOptionsBuilder::from_settings(TOKEN, &settings).build(&handles).unwrap();
        assert!(!options.insights_enabled());
        assert_eq!(options.ice_options(), Some(&ice));
    }

    #[test]
    fn test_debug_redacts_token() {
        let handles = HandleRegistry::new();
        let options = ConnectOptionsBuilder::new("secret-token").build(&handles).unwrap();
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
