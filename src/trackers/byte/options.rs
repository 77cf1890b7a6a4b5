use crate::utils::kalman::kalman_bbox::{DEFAULT_POSITION_WEIGHT, DEFAULT_VELOCITY_WEIGHT};
use crate::Errors;
use anyhow::Result;

pub const DEFAULT_TRACK_ACTIVATION_THRESHOLD: f32 = 0.6;
pub const DEFAULT_LOW_CONFIDENCE_FLOOR: f32 = 0.1;
pub const DEFAULT_HIGH_MATCH_IOU_THRESHOLD: f32 = 0.2;
pub const DEFAULT_LOW_MATCH_IOU_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MIN_HITS_TO_CONFIRM: usize = 2;
pub const DEFAULT_MAX_AGE: usize = 30;

/// Frame rate the lost track buffer is expressed in
pub const REFERENCE_FRAME_RATE: f32 = 30.0;

/// Class that is used to configure the ByteTrack tracker
///
#[derive(Debug, Clone, PartialEq)]
pub struct ByteTrackOptions {
    pub(crate) track_activation_threshold: f32,
    pub(crate) low_confidence_floor: f32,
    pub(crate) high_match_iou_threshold: f32,
    pub(crate) low_match_iou_threshold: f32,
    pub(crate) min_hits_to_confirm: usize,
    pub(crate) max_age: usize,
    pub(crate) emit_tentative: bool,
    pub(crate) class_aware: bool,
    pub(crate) keep_wasted: bool,
    pub(crate) kalman_position_weight: f32,
    pub(crate) kalman_velocity_weight: f32,
}

impl Default for ByteTrackOptions {
    fn default() -> Self {
        Self {
            track_activation_threshold: DEFAULT_TRACK_ACTIVATION_THRESHOLD,
            low_confidence_floor: DEFAULT_LOW_CONFIDENCE_FLOOR,
            high_match_iou_threshold: DEFAULT_HIGH_MATCH_IOU_THRESHOLD,
            low_match_iou_threshold: DEFAULT_LOW_MATCH_IOU_THRESHOLD,
            min_hits_to_confirm: DEFAULT_MIN_HITS_TO_CONFIRM,
            max_age: DEFAULT_MAX_AGE,
            emit_tentative: false,
            class_aware: false,
            keep_wasted: false,
            kalman_position_weight: DEFAULT_POSITION_WEIGHT,
            kalman_velocity_weight: DEFAULT_VELOCITY_WEIGHT,
        }
    }
}

impl ByteTrackOptions {
    /// The minimal detection confidence that takes part in the first association stage and is
    /// allowed to originate a new track.
    ///
    pub fn track_activation_threshold(mut self, threshold: f32) -> Self {
        self.track_activation_threshold = threshold;
        self
    }

    /// Detections with the confidence in `[low_confidence_floor, track_activation_threshold)`
    /// are only used to keep the existing tracks alive in the second association stage. The
    /// detections below the floor are ignored.
    ///
    pub fn low_confidence_floor(mut self, floor: f32) -> Self {
        self.low_confidence_floor = floor;
        self
    }

    /// The minimal IoU between a predicted track box and a high confidence detection that
    /// allows matching them.
    ///
    pub fn high_match_iou_threshold(mut self, threshold: f32) -> Self {
        self.high_match_iou_threshold = threshold;
        self
    }

    /// The minimal IoU between a predicted track box and a low confidence detection that
    /// allows matching them. Usually stricter than the high confidence one.
    ///
    pub fn low_match_iou_threshold(mut self, threshold: f32) -> Self {
        self.low_match_iou_threshold = threshold;
        self
    }

    /// The number of consecutive matches (the creating detection included) a new track needs
    /// to become confirmed.
    ///
    pub fn min_hits_to_confirm(mut self, n: usize) -> Self {
        self.min_hits_to_confirm = n;
        self
    }

    /// The number of epochs a lost track survives without being matched. The track is removed
    /// on the epoch when the number of missed epochs exceeds `max_age`.
    ///
    pub fn max_age(mut self, n: usize) -> Self {
        self.max_age = n;
        self
    }

    /// Sets `max_age` from the lost track buffer expressed in frames of a 30 FPS stream,
    /// rescaled to the actual frame rate.
    ///
    /// # Parameters
    /// * `buffer` - how many frames of a 30 FPS stream the lost track is kept
    /// * `frame_rate` - the frame rate of the processed stream
    ///
    pub fn lost_track_buffer(mut self, buffer: usize, frame_rate: f32) -> Self {
        let max_age = (f64::from(frame_rate) / f64::from(REFERENCE_FRAME_RATE) * buffer as f64)
            .floor()
            .max(0.0);
        self.max_age = max_age as usize;
        self
    }

    /// Also report tentative tracks which were matched or created in the current epoch
    ///
    pub fn emit_tentative(mut self, emit: bool) -> Self {
        self.emit_tentative = emit;
        self
    }

    /// Forbids matching a track with a detection of another class
    ///
    pub fn class_aware(mut self, class_aware: bool) -> Self {
        self.class_aware = class_aware;
        self
    }

    /// Keeps the removed tracks until they are fetched with `ByteTrack::wasted`
    ///
    pub fn keep_wasted(mut self, keep: bool) -> Self {
        self.keep_wasted = keep;
        self
    }

    /// Kalman filter noise weights relative to the box height (shouldn't be changed without the need)
    ///
    pub fn kalman_position_weight(mut self, weight: f32) -> Self {
        self.kalman_position_weight = weight;
        self
    }

    pub fn kalman_velocity_weight(mut self, weight: f32) -> Self {
        self.kalman_velocity_weight = weight;
        self
    }

    pub fn get_max_age(&self) -> usize {
        self.max_age
    }

    pub fn get_min_hits_to_confirm(&self) -> usize {
        self.min_hits_to_confirm
    }

    /// Checks that the options describe a working tracker
    ///
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| -> Result<()> {
            if v.is_finite() && v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(Errors::InvalidOption(format!("{name} = {v} must lay within (0, 1]")).into())
            }
        };

        unit(
            "track_activation_threshold",
            self.track_activation_threshold,
        )?;
        unit("high_match_iou_threshold", self.high_match_iou_threshold)?;
        unit("low_match_iou_threshold", self.low_match_iou_threshold)?;

        if !(self.low_confidence_floor >= 0.0
            && self.low_confidence_floor <= self.track_activation_threshold)
        {
            return Err(Errors::InvalidOption(format!(
                "low_confidence_floor = {} must lay within [0, {}]",
                self.low_confidence_floor, self.track_activation_threshold
            ))
            .into());
        }

        if self.min_hits_to_confirm == 0 {
            return Err(
                Errors::InvalidOption("min_hits_to_confirm must be positive".into()).into(),
            );
        }

        for (name, w) in [
            ("kalman_position_weight", self.kalman_position_weight),
            ("kalman_velocity_weight", self.kalman_velocity_weight),
        ] {
            if !(w.is_finite() && w > 0.0) {
                return Err(
                    Errors::InvalidOption(format!("{name} = {w} must be positive")).into(),
                );
            }
        }

        Ok(())
    }
}

#[cfg(feature = "python")]
pub mod python {
    use super::ByteTrackOptions;
    use pyo3::prelude::*;

    #[pyclass]
    #[pyo3(name = "ByteTrackOptions")]
    #[derive(Debug, Clone)]
    pub struct PyByteTrackOptions(pub(crate) ByteTrackOptions);

    #[pymethods]
    impl PyByteTrackOptions {
        #[new]
        fn new() -> Self {
            Self(ByteTrackOptions::default())
        }

        fn track_activation_threshold(&mut self, threshold: f32) {
            self.0 = self.0.clone().track_activation_threshold(threshold);
        }

        fn low_confidence_floor(&mut self, floor: f32) {
            self.0 = self.0.clone().low_confidence_floor(floor);
        }

        fn high_match_iou_threshold(&mut self, threshold: f32) {
            self.0 = self.0.clone().high_match_iou_threshold(threshold);
        }

        fn low_match_iou_threshold(&mut self, threshold: f32) {
            self.0 = self.0.clone().low_match_iou_threshold(threshold);
        }

        fn min_hits_to_confirm(&mut self, n: usize) {
            self.0 = self.0.clone().min_hits_to_confirm(n);
        }

        fn max_age(&mut self, n: usize) {
            self.0 = self.0.clone().max_age(n);
        }

        fn lost_track_buffer(&mut self, buffer: usize, frame_rate: f32) {
            self.0 = self.0.clone().lost_track_buffer(buffer, frame_rate);
        }

        fn emit_tentative(&mut self, emit: bool) {
            self.0 = self.0.clone().emit_tentative(emit);
        }

        fn class_aware(&mut self, class_aware: bool) {
            self.0 = self.0.clone().class_aware(class_aware);
        }

        fn keep_wasted(&mut self, keep: bool) {
            self.0 = self.0.clone().keep_wasted(keep);
        }

        fn kalman_position_weight(&mut self, weight: f32) {
            self.0 = self.0.clone().kalman_position_weight(weight);
        }

        fn kalman_velocity_weight(&mut self, weight: f32) {
            self.0 = self.0.clone().kalman_velocity_weight(weight);
        }

        #[classattr]
        const __hash__: Option<Py<PyAny>> = None;

        fn __repr__(&self) -> String {
            format!("{:?}", self.0)
        }

        fn __str__(&self) -> String {
            format!("{:#?}", self.0)
        }
    }
}
