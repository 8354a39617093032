//! Statistics for published local tracks
//!
//! The media engine owns the counters; these types are the snapshot it
//! reports through [`MediaEngine::track_stats`](crate::MediaEngine::track_stats).
//! [`LocalParticipant::stats`](crate::LocalParticipant::stats) gathers one
//! [`StatsReport`] for everything the participant currently publishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::ParticipantSid;
use crate::track::{TrackId, VideoDimensions};

/// Sender-side statistics for a local audio track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAudioTrackStats {
    pub track_id: TrackId,
    pub packets_lost: u32,
    pub codec_name: String,
    pub ssrc: String,
    pub timestamp: DateTime<Utc>,
    pub bytes_sent: u64,
    pub packets_sent: u32,
    pub round_trip_time_ms: u64,
    /// Input level, 0 to 32767
    pub audio_input_level: u32,
    pub jitter_received_ms: u32,
    pub jitter_buffer_ms: u32,
}

/// Sender-side statistics for a local video track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVideoTrackStats {
    pub track_id: TrackId,
    pub packets_lost: u32,
    pub codec_name: String,
    pub ssrc: String,
    pub timestamp: DateTime<Utc>,
    pub bytes_sent: u64,
    pub packets_sent: u32,
    pub round_trip_time_ms: u64,
    pub capture_dimensions: VideoDimensions,
    /// Dimensions actually sent after scaling
    pub dimensions: VideoDimensions,
    pub capture_frame_rate: u32,
    pub frame_rate: u32,
}

/// Statistics for one track of either kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackStats {
    Audio(LocalAudioTrackStats),
    Video(LocalVideoTrackStats),
}

impl TrackStats {
    pub fn track_id(&self) -> TrackId {
        match self {
            TrackStats::Audio(stats) => stats.track_id,
            TrackStats::Video(stats) => stats.track_id,
        }
    }
}

/// Stats for every track a participant publishes, collected at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub participant_sid: ParticipantSid,
    pub collected_at: DateTime<Utc>,
    pub audio_tracks: Vec<LocalAudioTrackStats>,
    pub video_tracks: Vec<LocalVideoTrackStats>,
}

impl StatsReport {
    pub fn new(participant_sid: ParticipantSid) -> Self {
        Self {
            participant_sid,
            collected_at: Utc::now(),
            audio_tracks: Vec::new(),
            video_tracks: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, stats: TrackStats) {
        match stats {
            TrackStats::Audio(stats) => self.audio_tracks.push(stats),
            TrackStats::Video(stats) => self.video_tracks.push(stats),
        }
    }

    /// Total bytes sent across all tracks
    pub fn total_bytes_sent(&self) -> u64 {
        self.audio_tracks.iter().map(|s| s.bytes_sent).sum::<u64>()
            + self.video_tracks.iter().map(|s| s.bytes_sent).sum::<u64>()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_tracks.is_empty() && self.video_tracks.is_empty()
    }
}
