use crate::utils::kalman::kalman_bbox::DIM_BBOX_X2;
use crate::utils::kalman::KalmanState;
use crate::{EstimateClose, EPS};

/// The smallest width or height a box may have once converted to the aspect representation.
/// Collapsed boxes are widened to this extent so that the aspect ratio stays finite.
///
pub const MIN_EXTENT: f32 = 1.0e-3;

/// Bounding box in the format (left, top, right, bottom)
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl BoundingBox {
    /// Constructor. Coordinates are not validated, use [`crate::detection::Detection::new`]
    /// to check boxes received from a detector.
    ///
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Constructor from (left, top, width, height)
    ///
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn as_ltrb(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    /// Intersection area of two boxes, `0` when they do not overlap
    ///
    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let (x1, y1) = (l.left.max(r.left), l.top.max(r.top));
        let (x2, y2) = (l.right.min(r.right), l.bottom.min(r.bottom));

        let int_width = x2 - x1;
        let int_height = y2 - y1;

        if int_width > 0.0 && int_height > 0.0 {
            int_width * int_height
        } else {
            0.0
        }
    }

    /// Intersection over union, lays within `[0, 1]`. Areas are accumulated in `f64`, so large
    /// boxes do not overflow; any non-finite outcome is reported as no overlap.
    ///
    pub fn iou(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let area = |b: &BoundingBox| {
            let (width, height) = (b.width().max(0.0), b.height().max(0.0));
            f64::from(width) * f64::from(height)
        };

        let (x1, y1) = (l.left.max(r.left), l.top.max(r.top));
        let (x2, y2) = (l.right.min(r.right), l.bottom.min(r.bottom));
        let int_width = f64::from(x2) - f64::from(x1);
        let int_height = f64::from(y2) - f64::from(y1);
        if int_width <= 0.0 || int_height <= 0.0 {
            return 0.0;
        }

        let intersection = int_width * int_height;
        let union = area(l) + area(r) - intersection;
        let iou = intersection / union;
        if union > 0.0 && iou.is_finite() {
            iou.clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

impl EstimateClose for BoundingBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.left - other.left).abs() < eps
            && (self.top - other.top).abs() < eps
            && (self.right - other.right).abs() < eps
            && (self.bottom - other.bottom).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

/// Bounding box in the format (xc, yc, aspect, height) where `aspect = width / height`.
/// It is the measurement space of the Kalman filter.
///
#[derive(Clone, Default, Debug, Copy)]
pub struct AspectBox {
    pub xc: f32,
    pub yc: f32,
    pub aspect: f32,
    pub height: f32,
}

impl AspectBox {
    pub fn new(xc: f32, yc: f32, aspect: f32, height: f32) -> Self {
        Self {
            xc,
            yc,
            aspect,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.aspect * self.height
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height
    }
}

impl EstimateClose for AspectBox {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.xc - other.xc).abs() < eps
            && (self.yc - other.yc).abs() < eps
            && (self.aspect - other.aspect).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}

impl PartialEq<Self> for AspectBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

impl From<&BoundingBox> for AspectBox {
    fn from(f: &BoundingBox) -> Self {
        let width = f.width().max(MIN_EXTENT);
        let height = f.height().max(MIN_EXTENT);
        AspectBox {
            xc: (f.left + f.right) / 2.0,
            yc: (f.top + f.bottom) / 2.0,
            aspect: width / height,
            height,
        }
    }
}

impl From<BoundingBox> for AspectBox {
    fn from(f: BoundingBox) -> Self {
        AspectBox::from(&f)
    }
}

impl From<&AspectBox> for BoundingBox {
    fn from(f: &AspectBox) -> Self {
        let height = f.height.max(MIN_EXTENT);
        let width = (f.aspect * height).max(MIN_EXTENT);
        BoundingBox {
            left: f.xc - width / 2.0,
            top: f.yc - height / 2.0,
            right: f.xc + width / 2.0,
            bottom: f.yc + height / 2.0,
        }
    }
}

impl From<AspectBox> for BoundingBox {
    fn from(f: AspectBox) -> Self {
        BoundingBox::from(&f)
    }
}

impl From<&KalmanState<DIM_BBOX_X2>> for AspectBox {
    fn from(s: &KalmanState<DIM_BBOX_X2>) -> Self {
        let mean = s.mean();
        AspectBox::new(mean[0], mean[1], mean[2], mean[3])
    }
}

impl From<&KalmanState<DIM_BBOX_X2>> for BoundingBox {
    fn from(s: &KalmanState<DIM_BBOX_X2>) -> Self {
        BoundingBox::from(AspectBox::from(s))
    }
}
