/// ByteTrack tracker: two-stage IoU association with a Kalman motion model
///
pub mod byte;
