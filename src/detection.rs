use crate::utils::bbox::BoundingBox;
use crate::Errors;
use anyhow::Result;
use log::warn;

/// Detector output for a single object in a single frame
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    bbox: BoundingBox,
    confidence: f32,
    class_id: Option<i64>,
    frame: usize,
}

impl Detection {
    /// Creates a validated detection
    ///
    /// # Parameters
    /// * `bbox` - the box in (left, top, right, bottom) form, must have finite coordinates, a positive width and height, and a finite area
    /// * `confidence` - detector score within `[0, 1]`
    ///
    pub fn new(bbox: BoundingBox, confidence: f32) -> Result<Self> {
        if !bbox.is_finite() {
            return Err(
                Errors::InvalidDetection(format!("non-finite coordinates in {bbox:?}")).into(),
            );
        }

        if bbox.left() >= bbox.right() || bbox.top() >= bbox.bottom() {
            return Err(Errors::InvalidDetection(format!("empty extent in {bbox:?}")).into());
        }

        if !bbox.area().is_finite() {
            return Err(Errors::InvalidDetection(format!("area of {bbox:?} overflows")).into());
        }

        if !(0.0..=1.0).contains(&confidence) {
            return Err(Errors::InvalidDetection(format!(
                "confidence {confidence} is outside of [0, 1]"
            ))
            .into());
        }

        Ok(Self {
            bbox,
            confidence,
            class_id: None,
            frame: 0,
        })
    }

    /// Creates a validated detection from (left, top, right, bottom) coordinates
    ///
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32, confidence: f32) -> Result<Self> {
        Self::new(BoundingBox::new(left, top, right, bottom), confidence)
    }

    pub fn with_class(mut self, class_id: i64) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn with_frame(mut self, frame: usize) -> Self {
        self.frame = frame;
        self
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class_id(&self) -> Option<i64> {
        self.class_id
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}

/// Raw detector record: `([left, top, right, bottom], confidence, class_id)`
///
pub type RawDetection = ([f32; 4], f32, Option<i64>);

/// Converts raw detector records of a frame into detections.
///
/// Malformed records are reported with `warn!` and skipped, they never fail the whole frame.
///
pub fn validate<I>(frame: usize, raw: I) -> Vec<Detection>
where
    I: IntoIterator<Item = RawDetection>,
{
    raw.into_iter()
        .enumerate()
        .filter_map(|(i, ([l, t, r, b], confidence, class_id))| {
            match Detection::ltrb(l, t, r, b, confidence) {
                Ok(d) => {
                    let d = d.with_frame(frame);
                    Some(match class_id {
                        Some(c) => d.with_class(c),
                        None => d,
                    })
                }
                Err(e) => {
                    warn!("Frame {frame}: detection #{i} is skipped: {e}");
                    None
                }
            }
        })
        .collect()
}
