use crate::detection::Detection;
use crate::trackers::byte::track::{Track, TrackState};
use crate::utils::kalman::kalman_bbox::BoundingBoxKalmanFilter;
use log::trace;

/// State transitions of tracks and identity allocation.
///
/// ```text
/// Tentative --hits >= min_hits_to_confirm--> Confirmed
/// Tentative --miss--> Removed
/// Confirmed --miss--> Lost
/// Lost --hit--> Confirmed
/// Lost --time_since_update > max_age--> Removed
/// ```
///
#[derive(Debug, Clone)]
pub struct TrackLifecycleManager {
    min_hits_to_confirm: usize,
    max_age: usize,
    track_id: u64,
}

impl TrackLifecycleManager {
    pub fn new(min_hits_to_confirm: usize, max_age: usize) -> Self {
        Self {
            min_hits_to_confirm,
            max_age,
            track_id: 0,
        }
    }

    fn gen_track_id(&mut self) -> u64 {
        self.track_id += 1;
        self.track_id
    }

    /// The last allocated id, `0` when no tracks were created yet
    pub fn last_track_id(&self) -> u64 {
        self.track_id
    }

    /// Creates a track for the detection with a fresh id
    ///
    pub fn spawn(
        &mut self,
        detection: &Detection,
        filter: &BoundingBoxKalmanFilter,
        epoch: usize,
    ) -> Track {
        let mut track = Track::new(self.gen_track_id(), detection, filter, epoch);
        if track.hits >= self.min_hits_to_confirm {
            track.state = TrackState::Confirmed;
        }
        trace!("Track {} is created as {:?}", track.id, track.state);
        track
    }

    /// The track was matched in the current epoch
    ///
    pub fn register_hit(&self, track: &mut Track) {
        track.hits += 1;
        track.time_since_update = 0;
        let state = match track.state {
            TrackState::Tentative if track.hits >= self.min_hits_to_confirm => {
                TrackState::Confirmed
            }
            TrackState::Lost => TrackState::Confirmed,
            s => s,
        };
        if state != track.state {
            trace!("Track {}: {:?} -> {:?}", track.id, track.state, state);
            track.state = state;
        }
    }

    /// The track was not matched in the current epoch
    ///
    pub fn register_miss(&self, track: &mut Track) {
        track.hits = 0;
        let mut state = match track.state {
            TrackState::Tentative => TrackState::Removed,
            TrackState::Confirmed => TrackState::Lost,
            s => s,
        };
        if state == TrackState::Lost && track.time_since_update > self.max_age {
            state = TrackState::Removed;
        }
        if state != track.state {
            trace!("Track {}: {:?} -> {:?}", track.id, track.state, state);
            track.state = state;
        }
    }
}
