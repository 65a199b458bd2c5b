//! Duplicate region suppression
//!
//! Watershed fusion of several detectors can produce more than one region for
//! the same object. A [`RegionSuppressor`] merges such duplicates.

use crate::error::{RegionError, RegionResult};
use std::collections::HashMap;
use tracing::debug;
use vollseg_core::{LabelField, RegionProps, region_props};

/// Removes duplicate regions from a label field
pub trait RegionSuppressor {
    /// Return a copy of `labels` with duplicate regions merged or removed
    ///
    /// # Arguments
    ///
    /// * `labels` - Input label field
    /// * `overlap_threshold` - Overlap at or above which two regions are duplicates
    /// * `z_window` - For 3-D fields, the largest centroid distance along axis 0
    ///   at which two regions may still be duplicates
    fn suppress(
        &self,
        labels: &LabelField,
        overlap_threshold: f64,
        z_window: usize,
    ) -> RegionResult<LabelField>;
}

/// Leaves every region as it is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoSuppression;

impl RegionSuppressor for NoSuppression {
    fn suppress(&self, labels: &LabelField, _: f64, _: usize) -> RegionResult<LabelField> {
        Ok(labels.clone())
    }
}

/// Merges regions whose bounding boxes overlap
///
/// Regions are visited from largest to smallest area (ties by ascending id).
/// A region whose box overlaps an already kept region's box by at least
/// `overlap_threshold` of the smaller box volume is relabeled to that kept
/// region's id; otherwise it is kept. Boxes that do not intersect never
/// merge. In 3-D the centroids must also lie within `z_window` along axis 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxOverlapSuppressor;

impl BoxOverlapSuppressor {
    fn duplicates(a: &RegionProps, b: &RegionProps, overlap_threshold: f64, z_window: usize) -> bool {
        if a.bbox.intersect(&b.bbox).is_none() {
            return false;
        }
        if a.bbox.overlap_fraction(&b.bbox) < overlap_threshold {
            return false;
        }
        a.centroid.len() < 3 || (a.centroid[0] - b.centroid[0]).abs() <= z_window as f64
    }
}

impl RegionSuppressor for BoxOverlapSuppressor {
    fn suppress(
        &self,
        labels: &LabelField,
        overlap_threshold: f64,
        z_window: usize,
    ) -> RegionResult<LabelField> {
        if overlap_threshold.is_nan() {
            return Err(RegionError::InvalidParameters(
                "overlap threshold is NaN".to_string(),
            ));
        }

        let mut regions = region_props(labels)?;
        regions.sort_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));

        let mut kept: Vec<&RegionProps> = Vec::with_capacity(regions.len());
        let mut remap: HashMap<u32, u32> = HashMap::new();
        for region in &regions {
            match kept
                .iter()
                .find(|k| Self::duplicates(k, region, overlap_threshold, z_window))
            {
                Some(k) => {
                    remap.insert(region.label, k.label);
                }
                None => kept.push(region),
            }
        }
        debug!(
            regions = regions.len(),
            merged = remap.len(),
            "suppressed overlapping regions"
        );

        if remap.is_empty() {
            return Ok(labels.clone());
        }
        Ok(labels.mapv(|v| remap.get(&v).copied().unwrap_or(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{IxDyn, array};

    #[test]
    fn test_no_suppression() {
        let field = array![[1u32, 2], [2, 1]].into_dyn();
        assert_eq!(NoSuppression.suppress(&field, 0.0, 0).unwrap(), field);
    }

    #[test]
    fn test_nested_region_merges_into_larger() {
        let field = array![
            [1u32, 1, 1, 1],
            [1, 2, 2, 1],
            [1, 2, 2, 1],
            [1, 1, 1, 1],
        ]
        .into_dyn();
        let out = BoxOverlapSuppressor.suppress(&field, 0.5, 1).unwrap();
        assert!(out.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_disjoint_regions_kept() {
        let field = array![[1u32, 1, 0, 2, 2]].into_dyn();
        let out = BoxOverlapSuppressor.suppress(&field, 0.0, 1).unwrap();
        assert_eq!(out, field);
    }

    #[test]
    fn test_threshold_above_overlap_keeps_both() {
        // Both boxes are 2x2 and share a single pixel
        let field = array![
            [1u32, 1, 0],
            [1, 2, 2],
            [0, 2, 2],
        ]
        .into_dyn();
        let kept = BoxOverlapSuppressor.suppress(&field, 0.5, 1).unwrap();
        assert_eq!(kept, field);
        // The smaller region folds into the larger one
        let merged = BoxOverlapSuppressor.suppress(&field, 0.2, 1).unwrap();
        assert!(merged.iter().filter(|&&v| v != 0).all(|&v| v == 2));
    }

    #[test]
    fn test_z_window_blocks_distant_slices() {
        let mut field = LabelField::zeros(IxDyn(&[6, 3, 3]));
        for z in 0..6 {
            field[[z, 1, 1]] = 1;
        }
        field[[5, 0, 1]] = 2;
        field[[5, 1, 0]] = 2;
        // Centroid of 1 is at z=2.5, of 2 at z=5
        let far = BoxOverlapSuppressor.suppress(&field, 0.1, 1).unwrap();
        assert_eq!(far, field);
        let near = BoxOverlapSuppressor.suppress(&field, 0.1, 3).unwrap();
        assert!(near.iter().filter(|&&v| v != 0).all(|&v| v == 1));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let field = array![1u32].into_dyn();
        assert!(BoxOverlapSuppressor.suppress(&field, f64::NAN, 0).is_err());
    }
}
