use crate::detection::Detection;
use crate::trackers::byte::cost::{ClassifiedBox, CostMatrixBuilder};
use crate::utils::linear_sum_assignment::assign;
use anyhow::Result;
use itertools::{Either, Itertools};

/// Detections of an epoch split by the confidence
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionPartition {
    /// indices of detections with `confidence >= track_activation_threshold`
    pub high: Vec<usize>,
    /// indices of detections with `low_confidence_floor <= confidence < track_activation_threshold`
    pub low: Vec<usize>,
}

/// Splits detections to the first and the second association stages. The detections below
/// `low_confidence_floor` are dropped.
///
pub fn partition(
    detections: &[Detection],
    track_activation_threshold: f32,
    low_confidence_floor: f32,
) -> DetectionPartition {
    let (high, low): (Vec<usize>, Vec<usize>) = detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.confidence() >= low_confidence_floor)
        .partition_map(|(i, d)| {
            if d.confidence() >= track_activation_threshold {
                Either::Left(i)
            } else {
                Either::Right(i)
            }
        });
    DetectionPartition { high, low }
}

/// Element taking part in an association stage: the index in the owning collection and the
/// box used to compute the cost
pub type Candidate = (usize, ClassifiedBox);

/// Result of a single association stage, all indices refer to the owning collections
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Association {
    /// `(track, detection)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Matches the tracks against the detections with the minimal total `1 - IoU` cost
///
pub fn associate(
    builder: &CostMatrixBuilder,
    tracks: &[Candidate],
    detections: &[Candidate],
) -> Result<Association> {
    if tracks.is_empty() || detections.is_empty() {
        return Ok(Association {
            matches: Vec::default(),
            unmatched_tracks: tracks.iter().map(|(i, _)| *i).collect(),
            unmatched_detections: detections.iter().map(|(i, _)| *i).collect(),
        });
    }

    let rows = tracks.iter().map(|(_, b)| *b).collect::<Vec<_>>();
    let columns = detections.iter().map(|(_, b)| *b).collect::<Vec<_>>();
    let assignment = assign(&builder.build(&rows, &columns))?;

    Ok(Association {
        matches: assignment
            .matches
            .into_iter()
            .map(|(r, c)| (tracks[r].0, detections[c].0))
            .collect(),
        unmatched_tracks: assignment
            .unmatched_rows
            .into_iter()
            .map(|r| tracks[r].0)
            .collect(),
        unmatched_detections: assignment
            .unmatched_columns
            .into_iter()
            .map(|c| detections[c].0)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use crate::detection::Detection;
    use crate::trackers::byte::association::{associate, partition, DetectionPartition};
    use crate::trackers::byte::cost::CostMatrixBuilder;
    use crate::utils::bbox::BoundingBox;

    #[test]
    fn partition_by_confidence() {
        let detections = [0.9, 0.05, 0.6, 0.59, 0.1, 0.0]
            .into_iter()
            .map(|c| Detection::ltrb(0.0, 0.0, 1.0, 1.0, c).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            partition(&detections, 0.6, 0.1),
            DetectionPartition {
                high: vec![0, 2],
                low: vec![3, 4],
            }
        );
    }

    #[test]
    fn indices_are_mapped_back() {
        let b = |x: f32| (BoundingBox::ltwh(x, 0.0, 10.0, 10.0), None);
        let tracks = [(3, b(0.0)), (7, b(100.0)), (9, b(300.0))];
        let detections = [(1, b(101.0)), (4, b(1.0)), (5, b(500.0))];

        let a = associate(&CostMatrixBuilder::new(0.2, false), &tracks, &detections).unwrap();
        assert_eq!(a.matches, vec![(3, 4), (7, 1)]);
        assert_eq!(a.unmatched_tracks, vec![9]);
        assert_eq!(a.unmatched_detections, vec![5]);
    }

    #[test]
    fn empty_side() {
        let b = (BoundingBox::ltwh(0.0, 0.0, 10.0, 10.0), None);
        let a = associate(&CostMatrixBuilder::new(0.2, false), &[(2, b)], &[]).unwrap();
        assert!(a.matches.is_empty());
        assert_eq!(a.unmatched_tracks, vec![2]);
        assert!(a.unmatched_detections.is_empty());
    }
}
