pub use crate::detection::Detection;
pub use crate::trackers::byte::options::ByteTrackOptions;
pub use crate::trackers::byte::simple_api::ByteTrack;
pub use crate::trackers::byte::track::TrackState;
pub use crate::trackers::byte::ByteTrackOutput;
pub use crate::utils::bbox::BoundingBox;
