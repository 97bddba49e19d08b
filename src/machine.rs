//! Applies decoded items to the now-playing snapshot.
//!
//! Fields arrive independently and in no particular order, so a track
//! change is only decided at the bundle-end marker (`mden`): if the
//! album/artist/title fingerprint differs from the one seen at the previous
//! bundle end, the track index moves forward by one.

use crate::decode::DecodedItem;
use crate::events::MetadataEvent;
use crate::types::{NowPlaying, PlaybackState};

/// Meaning of a four character item code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Artist,
    Album,
    Title,
    TrackLength,
    Play,
    Pause,
    BundleStart,
    BundleEnd,
    Other,
}

impl Code {
    pub fn classify(code: &str) -> Self {
        match code {
            "asar" => Code::Artist,
            "asal" => Code::Album,
            "minm" => Code::Title,
            "astm" => Code::TrackLength,
            // first frame received / resume
            "pffr" | "pres" => Code::Play,
            // pause / stream end
            "paus" | "pend" => Code::Pause,
            "mdst" => Code::BundleStart,
            "mden" => Code::BundleEnd,
            _ => Code::Other,
        }
    }
}

/// How album, artist and title are combined into a track fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FingerprintMode {
    /// Plain concatenation. "AB"+"C" and "A"+"BC" look like the same track.
    #[default]
    Concatenated,
    /// Fields joined with a unit separator, so shifted text is a different track.
    Separated,
}

impl FingerprintMode {
    pub fn fingerprint(self, now_playing: &NowPlaying) -> String {
        let parts = [
            now_playing.album.as_str(),
            now_playing.artist.as_str(),
            now_playing.title.as_str(),
        ];
        match self {
            FingerprintMode::Concatenated => parts.concat(),
            FingerprintMode::Separated => parts.join("\u{1f}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    now_playing: NowPlaying,
    last_identity_key: String,
    fingerprint: FingerprintMode,
}

impl StateMachine {
    pub fn new(fingerprint: FingerprintMode) -> Self {
        let now_playing = NowPlaying::default();
        Self {
            last_identity_key: fingerprint.fingerprint(&now_playing),
            now_playing,
            fingerprint,
        }
    }

    pub fn now_playing(&self) -> &NowPlaying {
        &self.now_playing
    }

    /// Apply one item and report what happened.
    pub fn apply(&mut self, item: &DecodedItem) -> Vec<MetadataEvent> {
        let mut events: Vec<MetadataEvent> = item
            .issues
            .iter()
            .cloned()
            .map(MetadataEvent::FieldIssue)
            .collect();

        let event = match Code::classify(&item.code) {
            Code::Artist => {
                self.now_playing.artist = item.text();
                MetadataEvent::Artist(self.now_playing.artist.clone())
            }
            Code::Album => {
                self.now_playing.album = item.text();
                MetadataEvent::Album(self.now_playing.album.clone())
            }
            Code::Title => {
                self.now_playing.title = item.text();
                MetadataEvent::Title(self.now_playing.title.clone())
            }
            Code::TrackLength => match item.be_u32() {
                Some(ms) => {
                    self.now_playing.track_length_ms = ms;
                    MetadataEvent::TrackLength(ms)
                }
                None => MetadataEvent::ShortTrackLength {
                    bytes: item.data.len(),
                },
            },
            Code::Play => self.set_playback(&item.code, PlaybackState::Playing),
            Code::Pause => self.set_playback(&item.code, PlaybackState::Paused),
            Code::BundleStart => MetadataEvent::BundleStart,
            Code::BundleEnd => self.end_bundle(),
            Code::Other => MetadataEvent::UnknownCode {
                kind: item.kind.clone(),
                code: item.code.clone(),
            },
        };
        events.push(event);
        events
    }

    fn set_playback(&mut self, code: &str, state: PlaybackState) -> MetadataEvent {
        self.now_playing.playback_state = state;
        MetadataEvent::Playback {
            code: code.to_string(),
            state,
        }
    }

    fn end_bundle(&mut self) -> MetadataEvent {
        let key = self.fingerprint.fingerprint(&self.now_playing);
        let track_changed = key != self.last_identity_key;
        if track_changed {
            self.now_playing.track_index += 1;
            self.last_identity_key = key;
        }
        MetadataEvent::BundleEnd {
            track_changed,
            track_index: self.now_playing.track_index,
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(FingerprintMode::default())
    }
}
