use parking_lot::RwLock;
use std::sync::Arc;

use crate::events::MetadataEvent;
use crate::types::{AppState, NowPlaying, ReaderStatus};

/// Shared between the reader thread (sole writer) and any number of consumers.
pub type SharedState = Arc<RwLock<AppState>>;

pub fn create_state() -> SharedState {
    Arc::new(RwLock::new(AppState::default()))
}

/// Publish the snapshot produced by one item together with its counters.
///
/// Done under a single write lock so readers never see half an item applied.
pub fn publish(state: &SharedState, now_playing: &NowPlaying, events: &[MetadataEvent]) {
    let mut state_guard = state.write();
    state_guard.now_playing.clone_from(now_playing);
    state_guard.stats.items += 1;
    for event in events {
        state_guard.stats.count(event);
    }
}

/// Count an item that never reached the state machine.
pub fn reject(state: &SharedState, event: &MetadataEvent) {
    state.write().stats.count(event);
}

pub fn set_status(state: &SharedState, status: ReaderStatus) {
    state.write().status = status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WrapperError;

    #[test]
    fn publish_replaces_snapshot_and_counts_item() {
        let state = create_state();
        let now_playing = NowPlaying {
            title: "Come Together".to_string(),
            track_index: 1,
            ..NowPlaying::default()
        };
        let events = [MetadataEvent::BundleEnd {
            track_changed: true,
            track_index: 1,
        }];

        publish(&state, &now_playing, &events);
        reject(&state, &MetadataEvent::Malformed(WrapperError::MissingItem));

        let guard = state.read();
        assert_eq!(guard.now_playing, now_playing);
        assert_eq!(guard.stats.items, 1);
        assert_eq!(guard.stats.tracks, 1);
        assert_eq!(guard.stats.malformed, 1);
        assert_eq!(guard.status, ReaderStatus::Idle);
    }
}
