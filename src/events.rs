use crate::decode::FieldIssue;
use crate::error::WrapperError;
use crate::types::{DecodeStats, PlaybackState};

/// Something the decoder or state machine did with an item.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataEvent {
    Artist(String),
    Album(String),
    Title(String),
    TrackLength(u32),
    /// `astm` payload too short to hold a u32; length left unchanged
    ShortTrackLength { bytes: usize },
    Playback { code: String, state: PlaybackState },
    BundleStart,
    BundleEnd { track_changed: bool, track_index: u32 },
    UnknownCode { kind: String, code: String },
    FieldIssue(FieldIssue),
    /// Item markup could not be parsed and the item was dropped
    Malformed(WrapperError),
}

/// Receives events after the snapshot they describe has been published.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MetadataEvent);
}

impl<F> EventSink for F
where
    F: Fn(&MetadataEvent) + Send + Sync,
{
    fn emit(&self, event: &MetadataEvent) {
        self(event)
    }
}

/// Writes events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &MetadataEvent) {
        match event {
            MetadataEvent::Artist(artist) => log::info!("Artist: {}", artist),
            MetadataEvent::Album(album) => log::info!("Album: {}", album),
            MetadataEvent::Title(title) => log::info!("Title: {}", title),
            MetadataEvent::TrackLength(ms) => log::info!("Track length: {} ms", ms),
            MetadataEvent::ShortTrackLength { bytes } => {
                log::warn!("Invalid track length data ({} bytes, need 4)", bytes)
            }
            MetadataEvent::Playback { code, state } => {
                log::info!(">> {:?} ({})", state, code)
            }
            MetadataEvent::BundleStart => log::debug!("Metadata bundle start"),
            MetadataEvent::BundleEnd {
                track_changed,
                track_index,
            } => {
                if *track_changed {
                    log::info!("Metadata bundle end, new track #{}", track_index);
                } else {
                    log::debug!("Metadata bundle end, same track #{}", track_index);
                }
            }
            MetadataEvent::UnknownCode { kind, code } => {
                log::debug!("Unknown code: {} ({})", code, kind)
            }
            MetadataEvent::FieldIssue(issue) => {
                log::warn!("Could not decode {} field: {}", issue.field, issue.error)
            }
            MetadataEvent::Malformed(error) => log::error!("Dropping malformed item: {}", error),
        }
    }
}

impl DecodeStats {
    /// Fold one event into the counters.
    pub fn count(&mut self, event: &MetadataEvent) {
        match event {
            MetadataEvent::ShortTrackLength { .. } => self.short_lengths += 1,
            MetadataEvent::UnknownCode { .. } => self.unknown_codes += 1,
            MetadataEvent::FieldIssue(_) => self.field_errors += 1,
            MetadataEvent::Malformed(_) => self.malformed += 1,
            MetadataEvent::BundleEnd {
                track_changed: true,
                ..
            } => self.tracks += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Field;
    use crate::error::FieldError;

    #[test]
    fn stats_count_recoverable_failures() {
        let mut stats = DecodeStats::default();
        let events = [
            MetadataEvent::ShortTrackLength { bytes: 2 },
            MetadataEvent::UnknownCode {
                kind: "ssnc".to_string(),
                code: "pvol".to_string(),
            },
            MetadataEvent::FieldIssue(FieldIssue {
                field: Field::Data,
                error: FieldError::Base64("bad".to_string()),
            }),
            MetadataEvent::Malformed(WrapperError::MissingItem),
            MetadataEvent::BundleEnd {
                track_changed: false,
                track_index: 1,
            },
            MetadataEvent::BundleEnd {
                track_changed: true,
                track_index: 2,
            },
            MetadataEvent::Title("Something".to_string()),
        ];
        for event in &events {
            stats.count(event);
        }

        assert_eq!(
            stats,
            DecodeStats {
                items: 0,
                malformed: 1,
                field_errors: 1,
                unknown_codes: 1,
                short_lengths: 1,
                tracks: 1,
            }
        );
    }

    #[test]
    fn closures_are_sinks() {
        let seen = parking_lot::Mutex::new(Vec::new());
        let sink = |event: &MetadataEvent| seen.lock().push(event.clone());
        sink.emit(&MetadataEvent::BundleStart);
        assert_eq!(*seen.lock(), vec![MetadataEvent::BundleStart]);
    }
}
