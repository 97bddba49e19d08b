use serde::{Deserialize, Serialize};

/// What is currently playing, as far as the metadata pipe has told us.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_length_ms: u32,
    pub playback_state: PlaybackState,
    /// Bumped once per distinct album/artist/title seen at a bundle end
    pub track_index: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Error,
}

/// Lifecycle of the reader thread, so consumers can tell stale data from live data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "reason")]
pub enum ReaderStatus {
    #[default]
    Idle,
    Reading,
    /// Source reached end of stream
    Finished,
    /// Stopped on request
    Stopped,
    Failed(String),
}

impl ReaderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReaderStatus::Finished | ReaderStatus::Stopped | ReaderStatus::Failed(_)
        )
    }
}

/// Running counters for everything the decoder skipped or applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Items that parsed and reached the state machine
    pub items: u64,
    /// Items dropped because the wrapper markup was unusable
    pub malformed: u64,
    /// Hex or base64 fields that decoded to empty
    pub field_errors: u64,
    pub unknown_codes: u64,
    /// `astm` items with fewer than four payload bytes
    pub short_lengths: u64,
    /// Track changes detected at bundle ends
    pub tracks: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub now_playing: NowPlaying,
    pub status: ReaderStatus,
    pub stats: DecodeStats,
}
