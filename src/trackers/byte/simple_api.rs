use crate::detection::Detection;
use crate::trackers::byte::association::{associate, partition, Candidate, DetectionPartition};
use crate::trackers::byte::cost::CostMatrixBuilder;
use crate::trackers::byte::lifecycle::TrackLifecycleManager;
use crate::trackers::byte::options::ByteTrackOptions;
use crate::trackers::byte::track::{Track, TrackState};
use crate::trackers::byte::ByteTrackOutput;
use crate::utils::kalman::kalman_bbox::{BoundingBoxKalmanFilter, DIM_BBOX_X2};
use crate::utils::kalman::KalmanState;
use anyhow::Result;
use itertools::Itertools;
use log::debug;

/// Easy to use ByteTrack tracker implementation.
///
/// Every call of [`ByteTrack::update`] is an epoch. Tracks are first matched against the
/// confident detections, the tracks left unmatched get a second chance against the
/// low-confidence ones, so objects survive the frames where the detector is unsure about them.
///
#[derive(Debug, Clone)]
pub struct ByteTrack {
    opts: ByteTrackOptions,
    filter: BoundingBoxKalmanFilter,
    lifecycle: TrackLifecycleManager,
    first_stage: CostMatrixBuilder,
    second_stage: CostMatrixBuilder,
    tracks: Vec<Track>,
    wasted: Vec<Track>,
    epoch: usize,
}

impl ByteTrack {
    /// Creates new tracker
    ///
    /// # Parameters
    /// * `opts` - tracker configuration, rejected with [`crate::Errors::InvalidOption`] when inconsistent
    ///
    pub fn new(opts: ByteTrackOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            filter: BoundingBoxKalmanFilter::new(
                opts.kalman_position_weight,
                opts.kalman_velocity_weight,
            ),
            lifecycle: TrackLifecycleManager::new(opts.min_hits_to_confirm, opts.max_age),
            first_stage: CostMatrixBuilder::new(opts.high_match_iou_threshold, opts.class_aware),
            second_stage: CostMatrixBuilder::new(opts.low_match_iou_threshold, opts.class_aware),
            tracks: Vec::default(),
            wasted: Vec::default(),
            epoch: 0,
            opts,
        })
    }

    pub fn options(&self) -> &ByteTrackOptions {
        &self.opts
    }

    /// The number of processed epochs
    pub fn current_epoch(&self) -> usize {
        self.epoch
    }

    /// Processes detections of the next epoch
    ///
    /// Returns the confirmed tracks (and the tentative ones updated in this epoch when
    /// `emit_tentative` is set) ordered by id. An empty slice is a valid input, it ages all
    /// the tracks.
    ///
    /// The epoch is applied as a whole: when an error is returned the tracker is left exactly
    /// as it was before the call, the epoch counter included.
    ///
    /// # Parameters
    /// * `detections` - detections received from a detector for the frame
    ///
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<ByteTrackOutput>> {
        let epoch = self.epoch + 1;
        let mut tracks = self.tracks.clone();
        for t in &mut tracks {
            t.predict(&self.filter);
        }

        let DetectionPartition { high, low } = partition(
            detections,
            self.opts.track_activation_threshold,
            self.opts.low_confidence_floor,
        );

        let detection_candidates = |indices: &[usize]| -> Vec<Candidate> {
            indices
                .iter()
                .map(|&i| (i, (*detections[i].bbox(), detections[i].class_id())))
                .collect()
        };

        let track_candidates = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, (*t.predicted_bbox(), t.class_id())))
            .collect::<Vec<_>>();

        let first = associate(
            &self.first_stage,
            &track_candidates,
            &detection_candidates(&high),
        )?;
        let first_corrected = self.corrections(&tracks, &first.matches, detections)?;

        let remaining_tracks = first
            .unmatched_tracks
            .iter()
            .map(|&i| track_candidates[i])
            .collect::<Vec<_>>();

        let second = associate(
            &self.second_stage,
            &remaining_tracks,
            &detection_candidates(&low),
        )?;
        let second_corrected = self.corrections(&tracks, &second.matches, detections)?;

        // nothing fails past this point
        self.epoch = epoch;
        self.commit(&mut tracks, &first.matches, first_corrected, detections);
        self.commit(&mut tracks, &second.matches, second_corrected, detections);

        for &i in &second.unmatched_tracks {
            self.lifecycle.register_miss(&mut tracks[i]);
        }

        for &i in &first.unmatched_detections {
            tracks.push(self.lifecycle.spawn(&detections[i], &self.filter, epoch));
        }
        self.tracks = tracks;

        debug!(
            "Epoch {}: {} high and {} low detections, {} + {} matched, {} new tracks",
            self.epoch,
            high.len(),
            low.len(),
            first.matches.len(),
            second.matches.len(),
            first.unmatched_detections.len()
        );

        self.prune();

        Ok(self
            .tracks
            .iter()
            .filter(|t| match t.state() {
                TrackState::Confirmed => true,
                TrackState::Tentative => {
                    self.opts.emit_tentative && t.last_updated_epoch() == self.epoch
                }
                _ => false,
            })
            .map(ByteTrackOutput::from)
            .sorted_by_key(|t| t.id)
            .collect())
    }

    fn corrections(
        &self,
        tracks: &[Track],
        matches: &[(usize, usize)],
        detections: &[Detection],
    ) -> Result<Vec<KalmanState<DIM_BBOX_X2>>> {
        matches
            .iter()
            .map(|&(t, d)| tracks[t].corrected(&self.filter, &detections[d]))
            .collect()
    }

    fn commit(
        &self,
        tracks: &mut [Track],
        matches: &[(usize, usize)],
        corrected: Vec<KalmanState<DIM_BBOX_X2>>,
        detections: &[Detection],
    ) {
        for (&(t, d), motion) in matches.iter().zip(corrected) {
            let track = &mut tracks[t];
            track.observe(motion, &detections[d], self.epoch);
            self.lifecycle.register_hit(track);
        }
    }

    fn prune(&mut self) {
        let (live, removed): (Vec<_>, Vec<_>) = self
            .tracks
            .drain(..)
            .partition(|t| t.state().is_live());
        self.tracks = live;

        if !removed.is_empty() {
            debug!(
                "Epoch {}: tracks {:?} are removed",
                self.epoch,
                removed.iter().map(|t| t.id()).collect::<Vec<_>>()
            );
            if self.opts.keep_wasted {
                self.wasted.extend(removed);
            }
        }
    }

    /// All the tracks kept in the store
    ///
    pub fn active_tracks(&self) -> Vec<ByteTrackOutput> {
        self.tracks.iter().map(ByteTrackOutput::from).collect()
    }

    /// Tracks that were confirmed once but are not matched at the moment
    ///
    pub fn idle_tracks(&self) -> Vec<ByteTrackOutput> {
        self.tracks
            .iter()
            .filter(|t| t.state() == TrackState::Lost)
            .map(ByteTrackOutput::from)
            .collect()
    }

    /// Removed tracks collected since the last call. Always empty unless `keep_wasted` is set.
    ///
    pub fn wasted(&mut self) -> Vec<ByteTrackOutput> {
        std::mem::take(&mut self.wasted)
            .iter()
            .map(ByteTrackOutput::from)
            .collect()
    }

    pub fn clear_wasted(&mut self) {
        self.wasted.clear();
    }

    /// Drops all the tracks. Ids are still allocated after the last issued one.
    ///
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.wasted.clear();
    }
}

#[cfg(feature = "python")]
pub mod python {
    use super::ByteTrack;
    use crate::detection::{validate, RawDetection};
    use crate::trackers::byte::options::python::PyByteTrackOptions;
    use crate::trackers::byte::python::PyByteTrackOutput;
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    #[pyclass]
    #[pyo3(name = "ByteTrack")]
    pub struct PyByteTrack(pub(crate) ByteTrack);

    #[pymethods]
    impl PyByteTrack {
        #[new]
        #[pyo3(signature = (opts = None))]
        fn new(opts: Option<PyByteTrackOptions>) -> PyResult<Self> {
            ByteTrack::new(opts.map(|o| o.0).unwrap_or_default())
                .map(PyByteTrack)
                .map_err(|e| PyValueError::new_err(e.to_string()))
        }

        /// Receives `([left, top, right, bottom], confidence, class_id)` records,
        /// malformed ones are skipped
        ///
        fn update(
            &mut self,
            py: Python<'_>,
            detections: Vec<RawDetection>,
        ) -> PyResult<Vec<PyByteTrackOutput>> {
            let epoch = self.0.current_epoch() + 1;
            let tracker = &mut self.0;
            py.allow_threads(|| {
                let detections = validate(epoch, detections);
                tracker.update(&detections)
            })
            .map(|tracks| tracks.into_iter().map(PyByteTrackOutput).collect())
            .map_err(|e| PyValueError::new_err(e.to_string()))
        }

        #[getter]
        fn current_epoch(&self) -> usize {
            self.0.current_epoch()
        }

        fn active_tracks(&self) -> Vec<PyByteTrackOutput> {
            self.0
                .active_tracks()
                .into_iter()
                .map(PyByteTrackOutput)
                .collect()
        }

        fn idle_tracks(&self) -> Vec<PyByteTrackOutput> {
            self.0
                .idle_tracks()
                .into_iter()
                .map(PyByteTrackOutput)
                .collect()
        }

        fn wasted(&mut self) -> Vec<PyByteTrackOutput> {
            self.0.wasted().into_iter().map(PyByteTrackOutput).collect()
        }

        fn clear_wasted(&mut self) {
            self.0.clear_wasted();
        }

        fn clear(&mut self) {
            self.0.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::detection::Detection;
    use crate::trackers::byte::options::ByteTrackOptions;
    use crate::trackers::byte::simple_api::ByteTrack;
    use crate::trackers::byte::track::TrackState;
    use crate::trackers::byte::ByteTrackOutput;
    use crate::Errors;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn det(left: f32, top: f32, width: f32, height: f32, confidence: f32) -> Detection {
        Detection::ltrb(left, top, left + width, top + height, confidence).unwrap()
    }

    fn ids(tracks: &[ByteTrackOutput]) -> Vec<u64> {
        tracks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn invalid_options_are_rejected() {
        let err = ByteTrack::new(ByteTrackOptions::default().min_hits_to_confirm(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::InvalidOption(_))
        ));
    }

    #[test]
    fn empty_epochs() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        assert!(tracker.update(&[]).unwrap().is_empty());
        assert!(tracker.update(&[]).unwrap().is_empty());
        assert_eq!(tracker.current_epoch(), 2);
        assert!(tracker.active_tracks().is_empty());
    }

    #[test]
    fn tentative_is_confirmed_once() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();

        let out = tracker.update(&[det(10.0, 10.0, 40.0, 80.0, 0.9)]).unwrap();
        assert!(out.is_empty());
        let active = tracker.active_tracks();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].state, TrackState::Tentative);

        for i in 1..20 {
            let out = tracker
                .update(&[det(10.0 + i as f32, 10.0, 40.0, 80.0, 0.9)])
                .unwrap();
            assert_eq!(ids(&out), vec![1]);
            assert_eq!(out[0].state, TrackState::Confirmed);
            assert_eq!(out[0].length, i + 1);
            assert_eq!(out[0].epoch, i + 1);
        }
    }

    #[test]
    fn tentative_tracks_are_emitted_on_request() {
        let mut tracker =
            ByteTrack::new(ByteTrackOptions::default().emit_tentative(true)).unwrap();
        let out = tracker.update(&[det(10.0, 10.0, 40.0, 80.0, 0.9)]).unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(out[0].state, TrackState::Tentative);

        // a tentative track is removed by the first miss
        assert!(tracker.update(&[]).unwrap().is_empty());
        assert!(tracker.active_tracks().is_empty());
    }

    #[test]
    fn lost_track_is_removed_after_max_age() {
        let mut tracker = ByteTrack::new(
            ByteTrackOptions::default()
                .min_hits_to_confirm(1)
                .max_age(3)
                .keep_wasted(true),
        )
        .unwrap();

        let out = tracker.update(&[det(10.0, 10.0, 40.0, 80.0, 0.9)]).unwrap();
        assert_eq!(ids(&out), vec![1]);

        for _ in 0..3 {
            assert!(tracker.update(&[]).unwrap().is_empty());
            assert_eq!(ids(&tracker.idle_tracks()), vec![1]);
            assert!(tracker.wasted().is_empty());
        }

        tracker.update(&[]).unwrap();
        assert!(tracker.idle_tracks().is_empty());
        assert!(tracker.active_tracks().is_empty());
        let wasted = tracker.wasted();
        assert_eq!(ids(&wasted), vec![1]);
        assert_eq!(wasted[0].state, TrackState::Removed);
        assert!(tracker.wasted().is_empty());
    }

    #[test]
    fn lost_track_is_recovered() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default().max_age(5)).unwrap();
        let d = det(100.0, 100.0, 30.0, 60.0, 0.8);
        tracker.update(&[d]).unwrap();
        tracker.update(&[d]).unwrap();
        tracker.update(&[]).unwrap();
        tracker.update(&[]).unwrap();
        assert_eq!(ids(&tracker.idle_tracks()), vec![1]);

        let out = tracker.update(&[d]).unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(out[0].state, TrackState::Confirmed);
        assert!(tracker.idle_tracks().is_empty());
    }

    #[test]
    fn low_confidence_never_creates_tracks() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        for i in 0..10 {
            let out = tracker
                .update(&[
                    det(10.0 + i as f32, 10.0, 40.0, 80.0, 0.3),
                    det(200.0, 10.0, 40.0, 80.0, 0.59),
                    det(400.0, 10.0, 40.0, 80.0, 0.05),
                ])
                .unwrap();
            assert!(out.is_empty());
            assert!(tracker.active_tracks().is_empty());
        }
    }

    #[test]
    fn second_stage_keeps_the_track() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        for _ in 0..3 {
            tracker.update(&[det(10.0, 10.0, 40.0, 80.0, 0.9)]).unwrap();
        }

        let out = tracker
            .update(&[
                det(10.0, 10.0, 40.0, 80.0, 0.3),
                det(300.0, 10.0, 40.0, 80.0, 0.3),
            ])
            .unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(out[0].confidence, 0.3);
        assert_eq!(out[0].length, 4);
        assert_eq!(tracker.active_tracks().len(), 1);
    }

    #[test]
    fn second_stage_gate_is_stricter() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        for _ in 0..3 {
            tracker.update(&[det(0.0, 0.0, 40.0, 40.0, 0.9)]).unwrap();
        }

        // IoU = 1/3, enough for the first stage only
        let shifted = det(20.0, 0.0, 40.0, 40.0, 0.3);
        assert!(tracker.update(&[shifted]).unwrap().is_empty());
        assert_eq!(ids(&tracker.idle_tracks()), vec![1]);

        let shifted = det(20.0, 0.0, 40.0, 40.0, 0.9);
        let out = tracker.update(&[shifted]).unwrap();
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn floor_filters_out_detections() {
        let mut tracker =
            ByteTrack::new(ByteTrackOptions::default().low_confidence_floor(0.4)).unwrap();
        for _ in 0..3 {
            tracker.update(&[det(10.0, 10.0, 40.0, 80.0, 0.9)]).unwrap();
        }
        assert!(tracker
            .update(&[det(10.0, 10.0, 40.0, 80.0, 0.3)])
            .unwrap()
            .is_empty());
        assert_eq!(ids(&tracker.idle_tracks()), vec![1]);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut tracker = ByteTrack::new(
            ByteTrackOptions::default()
                .min_hits_to_confirm(1)
                .max_age(1),
        )
        .unwrap();
        let d = det(50.0, 50.0, 20.0, 20.0, 0.9);

        assert_eq!(ids(&tracker.update(&[d]).unwrap()), vec![1]);
        tracker.update(&[]).unwrap();
        tracker.update(&[]).unwrap();
        assert!(tracker.active_tracks().is_empty());

        assert_eq!(ids(&tracker.update(&[d]).unwrap()), vec![2]);

        tracker.clear();
        assert_eq!(ids(&tracker.update(&[d]).unwrap()), vec![3]);
    }

    #[test]
    fn outputs_are_ordered_by_id() {
        let mut tracker =
            ByteTrack::new(ByteTrackOptions::default().min_hits_to_confirm(1)).unwrap();
        let a = det(0.0, 0.0, 20.0, 20.0, 0.9);
        let b = det(100.0, 0.0, 20.0, 20.0, 0.9);
        let c = det(200.0, 0.0, 20.0, 20.0, 0.9);

        assert_eq!(ids(&tracker.update(&[c, a]).unwrap()), vec![1, 2]);
        let out = tracker.update(&[b, a, c]).unwrap();
        assert_eq!(ids(&out), vec![1, 2, 3]);
        assert_eq!(out[0].observed_bbox, *c.bbox());
        assert_eq!(out[1].observed_bbox, *a.bbox());
        assert_eq!(out[2].observed_bbox, *b.bbox());
    }

    #[test]
    fn moving_object_keeps_identity() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        for i in 0..60 {
            let x = 10.0 + 6.0 * i as f32;
            let out = tracker.update(&[det(x, 20.0, 30.0, 60.0, 0.9)]).unwrap();
            if i > 0 {
                assert_eq!(ids(&out), vec![1]);
            }
        }

        // a gap of a few frames is bridged by the motion model
        for _ in 0..3 {
            assert!(tracker.update(&[]).unwrap().is_empty());
        }
        let out = tracker
            .update(&[det(10.0 + 6.0 * 63.0, 20.0, 30.0, 60.0, 0.9)])
            .unwrap();
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn class_aware_matching() {
        let opts = ByteTrackOptions::default()
            .min_hits_to_confirm(1)
            .class_aware(true);
        let mut tracker = ByteTrack::new(opts).unwrap();
        let d = det(10.0, 10.0, 40.0, 80.0, 0.9);

        assert_eq!(ids(&tracker.update(&[d.with_class(1)]).unwrap()), vec![1]);
        let out = tracker.update(&[d.with_class(2)]).unwrap();
        assert_eq!(ids(&out), vec![2]);
        assert_eq!(out[0].class_id, Some(2));
        assert_eq!(ids(&tracker.idle_tracks()), vec![1]);
    }

    #[test]
    fn huge_boxes_are_matched() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        let d = Detection::ltrb(0.0, 0.0, 1.4e19, 1.4e19, 0.9).unwrap();
        assert!(tracker.update(&[d]).unwrap().is_empty());
        let out = tracker.update(&[d]).unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(tracker.active_tracks().len(), 1);

        assert!(Detection::ltrb(0.0, 0.0, 3e19, 3e19, 0.9).is_err());
    }

    #[test]
    fn failed_epoch_leaves_the_tracker_untouched() {
        let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
        let d = det(10.0, 10.0, 40.0, 80.0, 0.9);
        let other = det(500.0, 10.0, 40.0, 80.0, 0.9);
        tracker.update(&[d]).unwrap();
        tracker.update(&[d]).unwrap();

        let motion = tracker.tracks[0].motion;
        tracker.tracks[0].motion.covariance.fill(f32::NAN);
        let before = tracker.active_tracks();

        let err = tracker.update(&[d, other]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::KalmanUpdate)
        ));
        assert_eq!(tracker.current_epoch(), 2);
        assert_eq!(tracker.lifecycle.last_track_id(), 1);
        assert_eq!(tracker.active_tracks(), before);
        assert_eq!(tracker.tracks[0].age(), 1);
        assert_eq!(tracker.tracks[0].time_since_update(), 0);

        tracker.tracks[0].motion = motion;
        let out = tracker.update(&[d, other]).unwrap();
        assert_eq!(ids(&out), vec![1]);
        assert_eq!(out[0].length, 3);
        assert_eq!(tracker.current_epoch(), 3);
        assert_eq!(ids(&tracker.active_tracks()), vec![1, 2]);
    }

    #[test]
    fn runs_are_deterministic() {
        let scenario = {
            let mut rng = StdRng::seed_from_u64(21);
            let objects = (0..8)
                .map(|_| {
                    (
                        rng.gen_range(0.0..1000.0_f32),
                        rng.gen_range(0.0..1000.0_f32),
                        rng.gen_range(-3.0..3.0_f32),
                        rng.gen_range(-3.0..3.0_f32),
                    )
                })
                .collect::<Vec<_>>();
            (0..50)
                .map(|epoch| {
                    objects
                        .iter()
                        .filter_map(|(x, y, vx, vy)| {
                            if !rng.gen_bool(0.9) {
                                return None;
                            }
                            let t = epoch as f32;
                            Some(det(
                                x + vx * t + rng.gen_range(-1.0..1.0),
                                y + vy * t + rng.gen_range(-1.0..1.0),
                                40.0,
                                80.0,
                                rng.gen_range(0.2..1.0),
                            ))
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        };

        let run = || {
            let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();
            scenario
                .iter()
                .map(|frame| tracker.update(frame).unwrap())
                .collect::<Vec<_>>()
        };

        let bits = |runs: &[Vec<ByteTrackOutput>]| {
            runs.iter()
                .flatten()
                .map(|t| {
                    let boxes = t
                        .observed_bbox
                        .as_ltrb()
                        .into_iter()
                        .chain(t.predicted_bbox.as_ltrb())
                        .map(f32::to_bits)
                        .collect::<Vec<_>>();
                    (t.id, t.state, t.confidence.to_bits(), t.length, t.epoch, boxes)
                })
                .collect::<Vec<_>>()
        };

        let first = run();
        let second = run();
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(l, r)| l.len() == r.len()));
        assert_eq!(bits(&first), bits(&second));

        for out in &first {
            assert!(ids(out).windows(2).all(|w| w[0] < w[1]));
        }
        let seen = first.iter().flat_map(|out| ids(out)).unique().count();
        assert!(seen >= 8);
    }
}
