//! ByteTrack multi-object tracker.
//!
//! The crate implements the tracking core only: a constant-velocity Kalman motion model per
//! track, two-stage IoU association solved with the Hungarian algorithm, and the track lifecycle
//! (tentative, confirmed, lost, removed). Detectors, video IO and visualization are left to the
//! caller.
//!
pub mod detection;
pub mod examples;
pub mod prelude;
pub mod trackers;
pub mod utils;

#[cfg(feature = "python")]
mod py;

use thiserror::Error;

/// Errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    /// The detection does not satisfy the boundary contract (finite coordinates,
    /// `x1 < x2`, `y1 < y2`, confidence within `[0, 1]`).
    #[error("Invalid detection: {0}")]
    InvalidDetection(String),
    /// The tracker options are out of the allowed range.
    #[error("Invalid tracker option: {0}")]
    InvalidOption(String),
    /// Cost matrices must contain finite values only.
    #[error("Cost matrix contains a non-finite value at ({0}, {1})")]
    InvalidCostValue(usize, usize),
    /// The innovation covariance is not positive definite.
    #[error("Kalman update failed: innovation covariance is not positive definite")]
    KalmanUpdate,
}

pub(crate) const EPS: f32 = 0.00001;

/// Approximate comparison for floating point based objects
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}
