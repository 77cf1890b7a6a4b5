/// Bounding boxes
pub mod bbox;

/// Kalman filter
pub mod kalman;

/// Rectangular Hungarian solver
pub mod linear_sum_assignment;
