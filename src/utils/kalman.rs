use nalgebra::{SMatrix, SVector};

/// Kalman filter for bounding boxes in the (xc, yc, aspect, height) space
pub mod kalman_bbox;

/// Time step between two consecutive frames
pub const DT: u64 = 1;

/// Kalman filter state: the mean vector and the covariance matrix
///
#[derive(Copy, Clone, Debug)]
pub struct KalmanState<const X: usize> {
    pub(crate) mean: SVector<f32, X>,
    pub(crate) covariance: SMatrix<f32, X, X>,
}

impl<const X: usize> KalmanState<X> {
    pub fn mean(&self) -> &SVector<f32, X> {
        &self.mean
    }

    pub fn covariance(&self) -> &SMatrix<f32, X, X> {
        &self.covariance
    }
}
