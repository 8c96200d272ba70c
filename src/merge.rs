// src/merge.rs
//
// Overlap merging of raw detections.
//
// Cracks come out of the detector as many small, overlapping fragments.
// Every box is padded, then same-class boxes whose padded rectangles
// intersect are folded together. A cluster keeps growing as it absorbs
// boxes, so a box that only touches the grown union still joins. The
// result is the closure of that relation and does not depend on input order.

use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{BoundingBox, Detection, MergedRegion};

pub const DEFAULT_PADDING: f32 = 30.0;

#[derive(Debug, Clone, Copy)]
struct Cluster {
    bbox: BoundingBox,
    confidence: f32,
}

impl Cluster {
    fn absorb(&mut self, other: Cluster) {
        self.bbox = self.bbox.union(&other.bbox);
        self.confidence = self.confidence.max(other.confidence);
    }
}

/// Merge detections into one region per connected same-class cluster.
///
/// Output is ordered by class id; regions never span two classes.
pub fn merge_overlapping(
    detections: &[Detection],
    width: u32,
    height: u32,
    padding: f32,
) -> Vec<MergedRegion> {
    if detections.is_empty() {
        return Vec::new();
    }

    let (w, h) = (width as f32, height as f32);
    let mut by_class: BTreeMap<usize, Vec<Cluster>> = BTreeMap::new();
    for det in detections {
        by_class.entry(det.class_id).or_default().push(Cluster {
            bbox: det.bbox.expand_clamped(padding, w, h),
            confidence: det.confidence,
        });
    }

    let mut merged = Vec::new();
    for (class_id, clusters) in by_class {
        for cluster in close_over_intersection(clusters) {
            merged.push(MergedRegion {
                bbox: cluster.bbox,
                confidence: cluster.confidence,
                class_id,
            });
        }
    }

    if merged.len() < detections.len() {
        debug!(
            "Merged {} detections into {} regions",
            detections.len(),
            merged.len()
        );
    }

    merged
}

/// Fold clusters together until no two remaining rectangles intersect.
fn close_over_intersection(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut changed = true;
    while changed {
        changed = false;
        let mut i = 0;
        while i < clusters.len() {
            let mut j = i + 1;
            while j < clusters.len() {
                if clusters[i].bbox.intersects(&clusters[j].bbox) {
                    let other = clusters.swap_remove(j);
                    clusters[i].absorb(other);
                    changed = true;
                    // clusters[i] grew; rescan everything after it.
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32, class_id: usize) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), conf, class_id)
    }

    fn sorted(mut regions: Vec<MergedRegion>) -> Vec<(usize, [i64; 4], i64)> {
        let mut keys: Vec<_> = regions
            .drain(..)
            .map(|r| {
                (
                    r.class_id,
                    [
                        r.bbox.x1.round() as i64,
                        r.bbox.y1.round() as i64,
                        r.bbox.x2.round() as i64,
                        r.bbox.y2.round() as i64,
                    ],
                    (r.confidence * 1000.0).round() as i64,
                )
            })
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_overlapping(&[], 640, 480, DEFAULT_PADDING).is_empty());
    }

    #[test]
    fn test_zero_gap_same_class_merges() {
        let dets = [
            det(100.0, 100.0, 200.0, 200.0, 0.4, 0),
            det(200.0, 100.0, 300.0, 200.0, 0.7, 0),
        ];
        let merged = merge_overlapping(&dets, 1000, 1000, DEFAULT_PADDING);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BoundingBox::new(70.0, 70.0, 330.0, 230.0));
        assert_eq!(merged[0].confidence, 0.7);
    }

    #[test]
    fn test_different_classes_never_merge() {
        let dets = [
            det(100.0, 100.0, 200.0, 200.0, 0.9, 0),
            det(110.0, 110.0, 190.0, 190.0, 0.8, 1),
        ];
        let merged = merge_overlapping(&dets, 1000, 1000, DEFAULT_PADDING);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].class_id, 0);
        assert_eq!(merged[1].class_id, 1);
    }

    #[test]
    fn test_far_apart_boxes_stay_separate() {
        // 61px gap on both axes: padded rectangles still miss each other.
        let dets = [
            det(100.0, 100.0, 200.0, 200.0, 0.6, 0),
            det(261.0, 261.0, 300.0, 300.0, 0.6, 0),
        ];
        assert_eq!(merge_overlapping(&dets, 1000, 1000, DEFAULT_PADDING).len(), 2);

        // Exactly 2 x padding: padded edges touch, which is not an overlap.
        let dets = [
            det(100.0, 100.0, 200.0, 200.0, 0.6, 0),
            det(260.0, 100.0, 300.0, 200.0, 0.6, 0),
        ];
        assert_eq!(merge_overlapping(&dets, 1000, 1000, DEFAULT_PADDING).len(), 2);
    }

    #[test]
    fn test_transitive_growth_pulls_in_third_box() {
        // A and B overlap; C only overlaps the union of A and B.
        let a = det(0.0, 0.0, 100.0, 100.0, 0.5, 0);
        let b = det(90.0, 90.0, 200.0, 200.0, 0.6, 0);
        let c = det(160.0, 30.0, 180.0, 50.0, 0.9, 0);
        let merged = merge_overlapping(&[a, c, b], 1000, 1000, 10.0);
        assert_eq!(merged.len(), 1, "{:?}", merged);
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn test_padding_clamped_to_frame() {
        let merged = merge_overlapping(&[det(5.0, 5.0, 95.0, 95.0, 0.5, 2)], 100, 100, 30.0);
        assert_eq!(merged[0].bbox, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_order_independence() {
        let dets = vec![
            det(0.0, 0.0, 50.0, 50.0, 0.3, 0),
            det(400.0, 400.0, 450.0, 450.0, 0.8, 0),
            det(100.0, 0.0, 150.0, 50.0, 0.5, 0),
            det(300.0, 60.0, 320.0, 90.0, 0.2, 0),
            det(200.0, 0.0, 250.0, 50.0, 0.9, 1),
            det(440.0, 520.0, 470.0, 560.0, 0.4, 0),
            det(700.0, 700.0, 720.0, 720.0, 0.6, 0),
            det(160.0, 120.0, 240.0, 160.0, 0.7, 0),
        ];
        let expected = sorted(merge_overlapping(&dets, 1000, 1000, DEFAULT_PADDING));

        // Every rotation plus the reverse of each.
        for shift in 0..dets.len() {
            let mut permuted = dets.clone();
            permuted.rotate_left(shift);
            assert_eq!(sorted(merge_overlapping(&permuted, 1000, 1000, DEFAULT_PADDING)), expected);
            permuted.reverse();
            assert_eq!(sorted(merge_overlapping(&permuted, 1000, 1000, DEFAULT_PADDING)), expected);
        }
    }
}
