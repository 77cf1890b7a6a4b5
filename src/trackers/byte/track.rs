use crate::detection::Detection;
use crate::utils::bbox::{AspectBox, BoundingBox};
use crate::utils::kalman::kalman_bbox::{BoundingBoxKalmanFilter, DIM_BBOX_X2};
use crate::utils::kalman::KalmanState;
use anyhow::Result;

/// Lifecycle state of a track
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackState {
    /// created recently, not yet matched the required number of consecutive epochs
    Tentative,
    /// matched in the last epoch
    Confirmed,
    /// confirmed once, but missed in the last epoch(s)
    Lost,
    /// terminal state, the track is deleted from the store
    Removed,
}

impl TrackState {
    /// Tentative, confirmed and lost tracks take part in association
    pub fn is_live(&self) -> bool {
        !matches!(self, TrackState::Removed)
    }
}

/// Track kept in the tracker store. Each track owns its motion state.
///
#[derive(Debug, Clone)]
pub struct Track {
    pub(crate) id: u64,
    pub(crate) state: TrackState,
    pub(crate) motion: KalmanState<DIM_BBOX_X2>,
    pub(crate) class_id: Option<i64>,
    pub(crate) hits: usize,
    pub(crate) time_since_update: usize,
    pub(crate) age: usize,
    pub(crate) length: usize,
    pub(crate) last_updated_epoch: usize,
    pub(crate) observed_bbox: BoundingBox,
    pub(crate) confidence: f32,
    pub(crate) predicted_bbox: BoundingBox,
}

impl Track {
    /// Creates a tentative track from the first observation
    ///
    pub(crate) fn new(
        id: u64,
        detection: &Detection,
        filter: &BoundingBoxKalmanFilter,
        epoch: usize,
    ) -> Self {
        let motion = filter.initiate(&AspectBox::from(detection.bbox()));
        Self {
            id,
            state: TrackState::Tentative,
            predicted_bbox: BoundingBox::from(&motion),
            motion,
            class_id: detection.class_id(),
            hits: 1,
            time_since_update: 0,
            age: 0,
            length: 1,
            last_updated_epoch: epoch,
            observed_bbox: *detection.bbox(),
            confidence: detection.confidence(),
        }
    }

    /// Moves the motion state one epoch ahead
    ///
    pub(crate) fn predict(&mut self, filter: &BoundingBoxKalmanFilter) {
        self.motion = filter.predict(&self.motion);
        self.predicted_bbox = BoundingBox::from(&self.motion);
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Corrected motion state for the observation, the track itself is not changed
    ///
    pub(crate) fn corrected(
        &self,
        filter: &BoundingBoxKalmanFilter,
        detection: &Detection,
    ) -> Result<KalmanState<DIM_BBOX_X2>> {
        filter.update(&self.motion, &AspectBox::from(detection.bbox()))
    }

    /// Accepts the observation together with the motion state corrected for it
    ///
    pub(crate) fn observe(
        &mut self,
        motion: KalmanState<DIM_BBOX_X2>,
        detection: &Detection,
        epoch: usize,
    ) {
        self.motion = motion;
        self.predicted_bbox = BoundingBox::from(&self.motion);
        self.observed_bbox = *detection.bbox();
        self.confidence = detection.confidence();
        self.length += 1;
        self.last_updated_epoch = epoch;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn motion(&self) -> &KalmanState<DIM_BBOX_X2> {
        &self.motion
    }

    pub fn class_id(&self) -> Option<i64> {
        self.class_id
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn time_since_update(&self) -> usize {
        self.time_since_update
    }

    pub fn age(&self) -> usize {
        self.age
    }

    /// Total number of observations merged into the track
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn last_updated_epoch(&self) -> usize {
        self.last_updated_epoch
    }

    pub fn observed_bbox(&self) -> &BoundingBox {
        &self.observed_bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// The box estimated by the motion model for the current epoch
    pub fn predicted_bbox(&self) -> &BoundingBox {
        &self.predicted_bbox
    }
}

#[cfg(test)]
mod tests {
    use crate::detection::Detection;
    use crate::trackers::byte::track::{Track, TrackState};
    use crate::utils::bbox::BoundingBox;
    use crate::utils::kalman::kalman_bbox::BoundingBoxKalmanFilter;

    #[test]
    fn new_track() {
        let f = BoundingBoxKalmanFilter::default();
        let d = Detection::ltrb(10.0, 10.0, 30.0, 50.0, 0.8)
            .unwrap()
            .with_class(2);
        let t = Track::new(5, &d, &f, 3);
        assert_eq!(t.id(), 5);
        assert_eq!(t.state(), TrackState::Tentative);
        assert_eq!(t.hits(), 1);
        assert_eq!(t.length(), 1);
        assert_eq!(t.class_id(), Some(2));
        assert_eq!(t.last_updated_epoch(), 3);
        assert_eq!(t.predicted_bbox(), &BoundingBox::new(10.0, 10.0, 30.0, 50.0));
    }

    #[test]
    fn predict_and_observe() {
        let f = BoundingBoxKalmanFilter::default();
        let d = Detection::ltrb(10.0, 10.0, 30.0, 50.0, 0.8).unwrap();
        let mut t = Track::new(1, &d, &f, 1);

        t.predict(&f);
        assert_eq!(t.age(), 1);
        assert_eq!(t.time_since_update(), 1);

        let next = Detection::ltrb(12.0, 10.0, 32.0, 50.0, 0.7).unwrap();
        let motion = t.corrected(&f, &next).unwrap();
        // the track is untouched until the observation is accepted
        assert_eq!(t.length(), 1);

        t.observe(motion, &next, 2);
        assert_eq!(t.length(), 2);
        assert_eq!(t.last_updated_epoch(), 2);
        assert_eq!(t.confidence(), 0.7);
        assert_eq!(t.observed_bbox(), next.bbox());
        let xc = (t.predicted_bbox().left() + t.predicted_bbox().right()) / 2.0;
        assert!(xc > 20.0 && xc < 22.0);
    }

    #[test]
    fn liveness() {
        assert!(TrackState::Tentative.is_live());
        assert!(TrackState::Confirmed.is_live());
        assert!(TrackState::Lost.is_live());
        assert!(!TrackState::Removed.is_live());
    }
}
