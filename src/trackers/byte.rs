use crate::trackers::byte::track::{Track, TrackState};
use crate::utils::bbox::BoundingBox;

/// Splitting detections by confidence and matching them against tracks
pub mod association;
/// `1 - IoU` cost matrices
pub mod cost;
/// Track state transitions
pub mod lifecycle;
/// Tracker configuration
pub mod options;
/// Easy to use ByteTrack tracker
pub mod simple_api;
/// Track record
pub mod track;

/// Track information reported by the tracker for the last epoch
///
#[derive(Debug, Clone, PartialEq)]
pub struct ByteTrackOutput {
    /// id of the track
    ///
    pub id: u64,
    /// lifecycle state of the track
    ///
    pub state: TrackState,
    /// the bbox passed by detector in the last matched epoch
    ///
    pub observed_bbox: BoundingBox,
    /// the bbox estimated by KF
    ///
    pub predicted_bbox: BoundingBox,
    /// detector confidence of the last matched observation
    ///
    pub confidence: f32,
    /// class id passed with the detection that created the track
    ///
    pub class_id: Option<i64>,
    /// current track length
    ///
    pub length: usize,
    /// when the track was lastly updated
    ///
    pub epoch: usize,
}

impl From<&Track> for ByteTrackOutput {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id(),
            state: track.state(),
            observed_bbox: *track.observed_bbox(),
            predicted_bbox: *track.predicted_bbox(),
            confidence: track.confidence(),
            class_id: track.class_id(),
            length: track.length(),
            epoch: track.last_updated_epoch(),
        }
    }
}

#[cfg(feature = "python")]
pub mod python {
    use super::ByteTrackOutput;
    use pyo3::prelude::*;

    #[pyclass]
    #[pyo3(name = "ByteTrackOutput")]
    #[derive(Debug, Clone)]
    #[repr(transparent)]
    pub struct PyByteTrackOutput(pub(crate) ByteTrackOutput);

    #[pymethods]
    impl PyByteTrackOutput {
        #[classattr]
        const __hash__: Option<Py<PyAny>> = None;

        fn __repr__(&self) -> String {
            format!("{:?}", self.0)
        }

        fn __str__(&self) -> String {
            format!("{:#?}", self.0)
        }

        #[getter]
        fn get_id(&self) -> u64 {
            self.0.id
        }

        #[getter]
        fn get_state(&self) -> String {
            format!("{:?}", self.0.state)
        }

        /// (left, top, right, bottom)
        #[getter]
        fn get_observed_bbox(&self) -> (f32, f32, f32, f32) {
            let [l, t, r, b] = self.0.observed_bbox.as_ltrb();
            (l, t, r, b)
        }

        /// (left, top, right, bottom)
        #[getter]
        fn get_predicted_bbox(&self) -> (f32, f32, f32, f32) {
            let [l, t, r, b] = self.0.predicted_bbox.as_ltrb();
            (l, t, r, b)
        }

        #[getter]
        fn get_confidence(&self) -> f32 {
            self.0.confidence
        }

        #[getter]
        fn get_class_id(&self) -> Option<i64> {
            self.0.class_id
        }

        #[getter]
        fn get_length(&self) -> usize {
            self.0.length
        }

        #[getter]
        fn get_epoch(&self) -> usize {
            self.0.epoch
        }
    }
}
