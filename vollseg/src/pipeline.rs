//! Segmentation pipeline
//!
//! Combines whatever a detector produced into one label field. Every detector
//! output is optional; the result record carries the intermediate fields
//! that were available or derived, and `None` for the rest.

use tracing::debug;
use vollseg_core::{Connectivity, CostField, LabelField, Mask, check_shape};
use vollseg_morph::distance_transform_edt;
use vollseg_region::{
    BoxContainmentOracle, BoxOverlapSuppressor, DistinctnessOracle, MatchOptions,
    ReconstructOptions, Reconstructor, RegionError, RegionResult, RegionSuppressor,
    SequentialLabelMatcher, expand_labels, fill_label_holes, label_components,
    remove_big_objects, remove_small_objects,
};

/// Cost values below this are treated as zero
pub const DEFAULT_COST_FLOOR: f32 = 1e-2;

/// Raw outputs of a segmentation detector
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    /// Binary foreground mask
    pub mask: Option<Mask>,
    /// Per-pixel cost or probability; higher is more interior
    pub cost: Option<CostField>,
    /// Instance labels from an instance detector
    pub instance_labels: Option<LabelField>,
}

impl DetectorOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_cost(mut self, cost: CostField) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_instance_labels(mut self, labels: LabelField) -> Self {
        self.instance_labels = Some(labels);
        self
    }

    /// Check that every present field has the same shape
    fn check_shapes(&self) -> RegionResult<()> {
        let shapes = [
            self.mask.as_ref().map(|m| m.shape()),
            self.cost.as_ref().map(|c| c.shape()),
            self.instance_labels.as_ref().map(|l| l.shape()),
        ];
        let mut present = shapes.into_iter().flatten();
        let first = present.next().ok_or_else(|| {
            RegionError::InvalidParameters("detector output has no fields".to_string())
        })?;
        for shape in present {
            check_shape("detector output", first, shape)?;
        }
        Ok(())
    }
}

/// Options for [`segment`]
#[derive(Debug, Clone)]
pub struct SegmentationOptions {
    /// Zero cost values below the floor; `None` keeps the cost as is
    pub cost_floor: Option<f32>,
    /// Grow the final labels by this distance
    pub expand_distance: Option<f64>,
    /// Remove regions with fewer pixels; `0` keeps everything
    pub min_size: usize,
    /// Remove regions with more pixels
    pub max_size: Option<usize>,
    /// IoU threshold for matching consecutive frames in [`segment_sequence`]
    pub match_iou: Option<f64>,
    /// Options for the watershed reconstruction
    pub reconstruct: ReconstructOptions,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            cost_floor: Some(DEFAULT_COST_FLOOR),
            expand_distance: None,
            min_size: 0,
            max_size: None,
            match_iou: None,
            reconstruct: ReconstructOptions::default(),
        }
    }
}

impl SegmentationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost_floor(mut self, floor: Option<f32>) -> Self {
        self.cost_floor = floor;
        self
    }

    pub fn with_expand_distance(mut self, distance: f64) -> Self {
        self.expand_distance = Some(distance);
        self
    }

    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn with_match_iou(mut self, threshold: f64) -> Self {
        self.match_iou = Some(threshold);
        self
    }

    pub fn with_reconstruct(mut self, options: ReconstructOptions) -> Self {
        self.reconstruct = options;
        self
    }
}

/// Result of [`segment`]
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Final instance labels
    pub labels: LabelField,
    /// Watershed markers, when a reconstruction ran
    pub markers: Option<LabelField>,
    /// Mask the labels were constrained to
    pub mask: Option<Mask>,
    /// Instance labels passed in by the detector
    pub instance_labels: Option<LabelField>,
    /// Cost field after the floor, given or derived from the mask
    pub cost: Option<CostField>,
}

/// Cost derived from the mask when the detector gave none
fn mask_cost(mask: &Mask) -> RegionResult<CostField> {
    let distances = distance_transform_edt(mask)?;
    Ok(distances.mapv(|d| d.min(f32::MAX as f64) as f32))
}

/// Segment one detector output
///
/// # Arguments
///
/// * `output` - Detector output; needs a mask, instance labels, or both
/// * `options` - Pipeline options
/// * `oracle` - Distinctness strategy for the reconstruction
/// * `suppressor` - Duplicate suppression strategy for the reconstruction
///
/// With instance labels, the labels are reconstructed against the mask (or
/// against `instance_labels > 0` when there is no mask), flooding the cost
/// field or, without one, the mask's distance transform. With only a mask,
/// its connected components are labeled and their holes filled. The size
/// filters and the expansion run last; expansion never labels a pixel that
/// is outside the mask and was not already labeled.
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if the output has neither a
/// mask nor instance labels, and a shape error if its fields disagree.
pub fn segment<O, S>(
    output: &DetectorOutput,
    options: &SegmentationOptions,
    oracle: O,
    suppressor: S,
) -> RegionResult<Segmentation>
where
    O: DistinctnessOracle,
    S: RegionSuppressor,
{
    output.check_shapes()?;

    let cost = output.cost.as_ref().map(|cost| match options.cost_floor {
        Some(floor) => cost.mapv(|v| if v < floor { 0.0 } else { v }),
        None => cost.clone(),
    });

    let (mut labels, markers, mask, cost) = match (&output.instance_labels, &output.mask) {
        (Some(instances), mask) => {
            let mask = match mask {
                Some(mask) => mask.clone(),
                None => instances.mapv(|v| v != 0),
            };
            let cost = match cost {
                Some(cost) => cost,
                None => mask_cost(&mask)?,
            };
            let reconstructor =
                Reconstructor::with_strategies(oracle, suppressor, options.reconstruct.clone());
            let result = reconstructor.reconstruct_detailed(&mask, &cost, instances)?;
            (result.labels, Some(result.markers), result.mask, Some(cost))
        }
        (None, Some(mask)) => {
            let labels = fill_label_holes(&label_components(mask, Connectivity::Full)?)?;
            (labels, None, mask.clone(), cost)
        }
        (None, None) => {
            return Err(RegionError::InvalidParameters(
                "detector output needs a mask or instance labels".to_string(),
            ));
        }
    };

    if options.min_size > 0 {
        labels = remove_small_objects(&labels, options.min_size);
    }
    if let Some(max_size) = options.max_size {
        labels = remove_big_objects(&labels, max_size);
    }
    if let Some(distance) = options.expand_distance {
        let grown = expand_labels(&labels, distance)?;
        // Growth stays inside the mask and the regions' own pixels
        labels = ndarray::Zip::from(&grown)
            .and(&labels)
            .and(&mask)
            .map_collect(|&g, &l, &m| if m || l != 0 { g } else { 0 });
    }
    debug!(
        reconstructed = markers.is_some(),
        regions = vollseg_core::label_areas(&labels).len(),
        "segmented detector output"
    );

    Ok(Segmentation {
        labels,
        markers,
        mask: Some(mask),
        instance_labels: output.instance_labels.clone(),
        cost,
    })
}

/// [`segment`] with the box-containment oracle and box-overlap suppressor
pub fn segment_default(
    output: &DetectorOutput,
    options: &SegmentationOptions,
) -> RegionResult<Segmentation> {
    segment(output, options, BoxContainmentOracle, BoxOverlapSuppressor)
}

/// Segment every frame, then match consecutive frames
///
/// Frames are matched with the IoU matcher when `options.match_iou` is set;
/// otherwise each frame keeps its own ids.
pub fn segment_sequence<O, S>(
    outputs: &[DetectorOutput],
    options: &SegmentationOptions,
    oracle: O,
    suppressor: S,
) -> RegionResult<Vec<Segmentation>>
where
    O: DistinctnessOracle + Clone,
    S: RegionSuppressor + Clone,
{
    let mut frames = outputs
        .iter()
        .map(|output| segment(output, options, oracle.clone(), suppressor.clone()))
        .collect::<RegionResult<Vec<_>>>()?;

    if let Some(iou) = options.match_iou {
        let mut matcher = SequentialLabelMatcher::new(MatchOptions::new().with_iou_threshold(iou));
        for frame in &mut frames {
            frame.labels = matcher.push(&frame.labels)?;
        }
        debug!(frames = frames.len(), iou, "matched segmented frames");
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{IxDyn, array};
    use vollseg_core::region_props;

    #[test]
    fn test_needs_mask_or_instances() {
        let output = DetectorOutput::new().with_cost(CostField::zeros(IxDyn(&[3, 3])));
        let err = segment_default(&output, &SegmentationOptions::default()).unwrap_err();
        assert!(matches!(err, RegionError::InvalidParameters(_)));
        assert!(segment_default(&DetectorOutput::new(), &SegmentationOptions::default()).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let output = DetectorOutput::new()
            .with_mask(Mask::from_elem(IxDyn(&[3, 3]), true))
            .with_cost(CostField::zeros(IxDyn(&[3, 4])));
        let err = segment_default(&output, &SegmentationOptions::default()).unwrap_err();
        assert!(matches!(err, RegionError::Core(_)));
    }

    #[test]
    fn test_mask_only_with_cost_floor() {
        let mask = array![[true, true, false, true]].into_dyn();
        let cost = array![[0.005f32, 0.5, 0.0, 0.9]].into_dyn();
        let output = DetectorOutput::new().with_mask(mask.clone()).with_cost(cost);
        let seg = segment_default(&output, &SegmentationOptions::default()).unwrap();
        assert_eq!(seg.labels, array![[1u32, 1, 0, 2]].into_dyn());
        assert_eq!(seg.cost, Some(array![[0.0f32, 0.5, 0.0, 0.9]].into_dyn()));
        assert_eq!(seg.mask, Some(mask));
        assert!(seg.markers.is_none());
        assert!(seg.instance_labels.is_none());

        let unfloored = SegmentationOptions::new().with_cost_floor(None);
        let seg = segment_default(&output, &unfloored).unwrap();
        assert_eq!(seg.cost.unwrap()[[0, 0]], 0.005);
    }

    #[test]
    fn test_instances_without_mask() {
        let mut instances = LabelField::zeros(IxDyn(&[10, 10]));
        for y in 2..5 {
            for x in 2..5 {
                instances[[y, x]] = 4;
                instances[[y + 4, x + 4]] = 9;
            }
        }
        let output = DetectorOutput::new().with_instance_labels(instances.clone());
        let seg = segment_default(&output, &SegmentationOptions::default()).unwrap();

        assert_eq!(seg.labels.mapv(|v| v != 0), instances.mapv(|v| v != 0));
        assert_eq!(region_props(&seg.labels).unwrap().len(), 2);
        assert_ne!(seg.labels[[3, 3]], seg.labels[[7, 7]]);
        assert!(seg.markers.is_some());
        assert!(seg.cost.is_some());
        assert_eq!(seg.instance_labels, Some(instances));
    }

    #[test]
    fn test_size_filter_and_expansion() {
        let mask = array![[true, true, true, false, false, false, true]].into_dyn();
        let output = DetectorOutput::new().with_mask(mask);

        let options = SegmentationOptions::new().with_min_size(2);
        let seg = segment_default(&output, &options).unwrap();
        assert_eq!(seg.labels, array![[1u32, 1, 1, 0, 0, 0, 0]].into_dyn());

        let options = SegmentationOptions::new().with_max_size(2);
        let seg = segment_default(&output, &options).unwrap();
        assert_eq!(seg.labels, array![[0u32, 0, 0, 0, 0, 0, 2]].into_dyn());

        let options = SegmentationOptions::new().with_expand_distance(1.0);
        let seg = segment_default(&output, &options).unwrap();
        assert_eq!(seg.labels, array![[1u32, 1, 1, 0, 0, 0, 2]].into_dyn());
    }

    #[test]
    fn test_expansion_stays_inside_mask() {
        let mask = array![true, true, true, false, false, false, true].into_dyn();
        let instances = array![0u32, 1, 0, 0, 0, 0, 2].into_dyn();
        let output = DetectorOutput::new()
            .with_mask(mask.clone())
            .with_instance_labels(instances);
        let options = SegmentationOptions::new().with_expand_distance(1.0);
        let seg = segment_default(&output, &options).unwrap();

        for (&label, &inside) in seg.labels.iter().zip(mask.iter()) {
            assert!(inside || label == 0);
        }
        assert!(seg.labels.iter().take(3).all(|&v| v != 0));
        assert_ne!(seg.labels[[6]], 0);
    }

    #[test]
    fn test_expansion_keeps_filled_holes() {
        let mask = array![
            [true, true, true, false, false],
            [true, false, true, false, false],
            [true, true, true, false, false],
        ]
        .into_dyn();
        let output = DetectorOutput::new().with_mask(mask);
        let options = SegmentationOptions::new().with_expand_distance(1.0);
        let seg = segment_default(&output, &options).unwrap();
        assert_eq!(
            seg.labels,
            array![[1u32, 1, 1, 0, 0], [1, 1, 1, 0, 0], [1, 1, 1, 0, 0]].into_dyn()
        );
    }
}
