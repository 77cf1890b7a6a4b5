use crate::utils::bbox::BoundingBox;
use crate::utils::linear_sum_assignment::UNASSIGNABLE_COST;
use pathfinding::matrix::Matrix;
use rayon::prelude::*;

/// Matrices with at least this number of cells are computed with rayon
pub const PARALLEL_CELLS_THRESHOLD: usize = 2048;

/// Box with an optional class id, the element both sides of the cost matrix are built from
pub type ClassifiedBox = (BoundingBox, Option<i64>);

/// Builds `1 - IoU` cost matrices between predicted track boxes (rows) and detections (columns)
///
#[derive(Debug, Clone, Copy)]
pub struct CostMatrixBuilder {
    iou_threshold: f32,
    class_aware: bool,
}

impl CostMatrixBuilder {
    /// # Parameters
    /// * `iou_threshold` - pairs with the IoU below the threshold get [`UNASSIGNABLE_COST`]
    /// * `class_aware` - pairs with different class ids get [`UNASSIGNABLE_COST`]
    ///
    pub fn new(iou_threshold: f32, class_aware: bool) -> Self {
        Self {
            iou_threshold,
            class_aware,
        }
    }

    /// The cost of a single pair
    ///
    pub fn cost(&self, track: &ClassifiedBox, detection: &ClassifiedBox) -> f32 {
        if self.class_aware {
            if let (Some(l), Some(r)) = (track.1, detection.1) {
                if l != r {
                    return UNASSIGNABLE_COST;
                }
            }
        }

        let iou = BoundingBox::iou(&track.0, &detection.0);
        if iou < self.iou_threshold {
            UNASSIGNABLE_COST
        } else {
            1.0 - iou
        }
    }

    fn row(&self, track: &ClassifiedBox, detections: &[ClassifiedBox]) -> Vec<f32> {
        detections.iter().map(|d| self.cost(track, d)).collect()
    }

    pub fn build(&self, tracks: &[ClassifiedBox], detections: &[ClassifiedBox]) -> Matrix<f32> {
        let (rows, columns) = (tracks.len(), detections.len());
        let mut matrix = Matrix::new(rows, columns, UNASSIGNABLE_COST);
        if rows == 0 || columns == 0 {
            return matrix;
        }

        let values = if rows * columns >= PARALLEL_CELLS_THRESHOLD {
            tracks
                .par_iter()
                .map(|t| self.row(t, detections))
                .collect::<Vec<_>>()
        } else {
            tracks
                .iter()
                .map(|t| self.row(t, detections))
                .collect::<Vec<_>>()
        };

        for (r, row) in values.into_iter().enumerate() {
            for (c, v) in row.into_iter().enumerate() {
                matrix[(r, c)] = v;
            }
        }
        matrix
    }
}

/// Class agnostic `1 - IoU` cost matrix
///
pub fn iou_cost_matrix(
    tracks: &[BoundingBox],
    detections: &[BoundingBox],
    iou_threshold: f32,
) -> Matrix<f32> {
    let tracks = tracks.iter().map(|b| (*b, None)).collect::<Vec<_>>();
    let detections = detections.iter().map(|b| (*b, None)).collect::<Vec<_>>();
    CostMatrixBuilder::new(iou_threshold, false).build(&tracks, &detections)
}
