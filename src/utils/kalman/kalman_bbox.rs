// Original source code idea from
// https://github.com/nwojke/deep_sort/blob/master/deep_sort/kalman_filter.py
//
use crate::utils::bbox::{AspectBox, MIN_EXTENT};
use crate::utils::kalman::{KalmanState, DT};
use crate::Errors;
use anyhow::Result;
use nalgebra::{SMatrix, SVector};

pub const DIM_BBOX: usize = 4;
pub const DIM_BBOX_X2: usize = DIM_BBOX * 2;

/// Default weight of the position noise relative to the box height
pub const DEFAULT_POSITION_WEIGHT: f32 = 1.0 / 20.0;
/// Default weight of the velocity noise relative to the box height
pub const DEFAULT_VELOCITY_WEIGHT: f32 = 1.0 / 160.0;

/// Constant velocity Kalman filter for boxes.
///
/// The state is `(xc, yc, aspect, height, vxc, vyc, vaspect, vheight)`, the measurement is
/// `(xc, yc, aspect, height)`. Process and measurement noise are proportional to the box height
/// except for the aspect ratio which gets a constant noise.
///
#[derive(Debug, Clone)]
pub struct BoundingBoxKalmanFilter {
    motion_matrix: SMatrix<f32, DIM_BBOX_X2, DIM_BBOX_X2>,
    update_matrix: SMatrix<f32, DIM_BBOX, DIM_BBOX_X2>,
    std_position_weight: f32,
    std_velocity_weight: f32,
}

/// Default initializer
impl Default for BoundingBoxKalmanFilter {
    fn default() -> Self {
        BoundingBoxKalmanFilter::new(DEFAULT_POSITION_WEIGHT, DEFAULT_VELOCITY_WEIGHT)
    }
}

impl BoundingBoxKalmanFilter {
    /// Constructor with custom weights (shouldn't be used without the need)
    pub fn new(position_weight: f32, velocity_weight: f32) -> Self {
        let mut motion_matrix: SMatrix<f32, DIM_BBOX_X2, DIM_BBOX_X2> = SMatrix::identity();

        for i in 0..DIM_BBOX {
            motion_matrix[(i, DIM_BBOX + i)] = DT as f32;
        }

        BoundingBoxKalmanFilter {
            motion_matrix,
            update_matrix: SMatrix::identity(),
            std_position_weight: position_weight,
            std_velocity_weight: velocity_weight,
        }
    }

    fn std_position(&self, k: f32, cnst: f32, p: f32) -> [f32; DIM_BBOX] {
        let pos_weight = k * self.std_position_weight * p.max(MIN_EXTENT);
        [pos_weight, pos_weight, cnst, pos_weight]
    }

    fn std_velocity(&self, k: f32, cnst: f32, p: f32) -> [f32; DIM_BBOX] {
        let vel_weight = k * self.std_velocity_weight * p.max(MIN_EXTENT);
        [vel_weight, vel_weight, cnst, vel_weight]
    }

    /// Initialize the filter with the first observation
    ///
    pub fn initiate(&self, bbox: &AspectBox) -> KalmanState<DIM_BBOX_X2> {
        let mean: SVector<f32, DIM_BBOX_X2> = SVector::from_iterator([
            bbox.xc,
            bbox.yc,
            bbox.aspect,
            bbox.height,
            0.0,
            0.0,
            0.0,
            0.0,
        ]);

        let mut std: SVector<f32, DIM_BBOX_X2> = SVector::from_iterator(
            self.std_position(2.0, 1e-2, bbox.height)
                .into_iter()
                .chain(self.std_velocity(10.0, 1e-5, bbox.height)),
        );

        std = std.component_mul(&std);

        let covariance: SMatrix<f32, DIM_BBOX_X2, DIM_BBOX_X2> = SMatrix::from_diagonal(&std);
        KalmanState { mean, covariance }
    }

    /// Predicts the state from the last state
    ///
    pub fn predict(&self, state: &KalmanState<DIM_BBOX_X2>) -> KalmanState<DIM_BBOX_X2> {
        let (mean, covariance) = (state.mean, state.covariance);
        let std_pos = self.std_position(1.0, 1e-2, mean[3]);
        let std_vel = self.std_velocity(1.0, 1e-5, mean[3]);

        let mut std: SVector<f32, DIM_BBOX_X2> =
            SVector::from_iterator(std_pos.into_iter().chain(std_vel));

        std = std.component_mul(&std);

        let motion_cov: SMatrix<f32, DIM_BBOX_X2, DIM_BBOX_X2> = SMatrix::from_diagonal(&std);

        let mean = self.motion_matrix * mean;
        let covariance =
            self.motion_matrix * covariance * self.motion_matrix.transpose() + motion_cov;
        KalmanState { mean, covariance }
    }

    fn project(
        &self,
        mean: SVector<f32, DIM_BBOX_X2>,
        covariance: SMatrix<f32, DIM_BBOX_X2, DIM_BBOX_X2>,
    ) -> KalmanState<DIM_BBOX> {
        let mut std: SVector<f32, DIM_BBOX> =
            SVector::from_iterator(self.std_position(1.0, 1e-1, mean[3]));

        std = std.component_mul(&std);

        let innovation_cov: SMatrix<f32, DIM_BBOX, DIM_BBOX> = SMatrix::from_diagonal(&std);

        let mean = self.update_matrix * mean;
        let covariance =
            self.update_matrix * covariance * self.update_matrix.transpose() + innovation_cov;
        KalmanState { mean, covariance }
    }

    /// Updates the state with the current observation
    ///
    pub fn update(
        &self,
        state: &KalmanState<DIM_BBOX_X2>,
        measurement: &AspectBox,
    ) -> Result<KalmanState<DIM_BBOX_X2>> {
        let (mean, covariance) = (state.mean, state.covariance);
        let projected_state = self.project(mean, covariance);
        let (projected_mean, projected_cov) = (projected_state.mean, projected_state.covariance);

        let cholesky = projected_cov.cholesky().ok_or(Errors::KalmanUpdate)?;
        let b: SMatrix<f32, DIM_BBOX, DIM_BBOX_X2> =
            (covariance * self.update_matrix.transpose()).transpose();
        // transposed gain: S * K^T = (P * H^T)^T
        let kalman_gain_t: SMatrix<f32, DIM_BBOX, DIM_BBOX_X2> = cholesky.solve(&b);

        let innovation = SVector::<f32, DIM_BBOX>::from_iterator([
            measurement.xc,
            measurement.yc,
            measurement.aspect,
            measurement.height,
        ]) - projected_mean;

        let mean = mean + kalman_gain_t.transpose() * innovation;
        let covariance = covariance - kalman_gain_t.transpose() * projected_cov * kalman_gain_t;
        Ok(KalmanState { mean, covariance })
    }
}
