//! Sequential label matching
//!
//! Keeps instance identity stable along an ordered sequence of label fields
//! (z-slices of a stack or frames of a time series). Each field is renumbered
//! so that its regions reuse the ids of the regions they continue in the
//! previously committed field.
//!
//! Two strategies are provided:
//!
//! - IoU matching ([`match_pair`], [`match_sequence`]): optimal one-to-one
//!   assignment of region pairs by intersection-over-union.
//! - Centroid matching ([`match_centroids`]): each region takes the id of the
//!   previous region whose centroid is nearest, within a distance limit.

use crate::assign::{Edge, assign};
use crate::error::{RegionError, RegionResult};
use ndarray::{Axis, stack};
use rstar::{AABB, RTree};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};
use vollseg_core::{LabelField, check_shape, label_areas, max_label, region_props};

/// Default IoU at or above which two regions are the same instance
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// Default centroid distance within which two regions are the same instance
pub const DEFAULT_MAX_CENTROID_DISTANCE: f64 = 3.0;

/// Options for sequential matching
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Minimum IoU for a region pair to match
    pub iou_threshold: f64,
    /// Maximum centroid distance for the centroid matcher
    pub max_distance: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_distance: DEFAULT_MAX_CENTROID_DISTANCE,
        }
    }
}

impl MatchOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IoU threshold
    pub fn with_iou_threshold(mut self, threshold: f64) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set the centroid distance limit
    pub fn with_max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }
}

/// Ids available to regions that matched nothing
///
/// Hands out its ids in ascending order. Once exhausted it mints fresh ids
/// above every id it was told about, logging a warning each time.
#[derive(Debug, Clone)]
pub struct LabelReservoir {
    available: VecDeque<u32>,
    next_fresh: u32,
    minted: usize,
}

impl LabelReservoir {
    /// Reservoir of `1..=size` minus `taken`
    ///
    /// # Arguments
    ///
    /// * `size` - Upper end of the candidate range
    /// * `taken` - Ids already in use
    /// * `max_seen` - Largest id in use anywhere; fresh ids start above it
    pub fn new(size: u32, taken: impl IntoIterator<Item = u32>, max_seen: u32) -> Self {
        let taken: HashSet<u32> = taken.into_iter().collect();
        let available: VecDeque<u32> = (1..=size).filter(|id| !taken.contains(id)).collect();
        let next_fresh = max_seen.max(size).saturating_add(1);
        Self {
            available,
            next_fresh,
            minted: 0,
        }
    }

    /// Number of ids left before minting starts
    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// Number of fresh ids minted so far
    pub fn minted(&self) -> usize {
        self.minted
    }

    /// Take the smallest available id, minting a fresh one if none is left
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::LabelOverflow`] if the id space is exhausted.
    pub fn pop(&mut self) -> RegionResult<u32> {
        if let Some(id) = self.available.pop_front() {
            return Ok(id);
        }
        if self.next_fresh == u32::MAX {
            return Err(RegionError::LabelOverflow);
        }
        let id = self.next_fresh;
        self.next_fresh += 1;
        self.minted += 1;
        warn!(id, "label reservoir exhausted, minting a fresh id");
        Ok(id)
    }
}

fn check_threshold(name: &str, value: f64) -> RegionResult<()> {
    if value.is_nan() || value < 0.0 {
        return Err(RegionError::InvalidParameters(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Renumber `current` so that its regions reuse the ids of `previous`
///
/// Region pairs with an IoU of at least `iou_threshold` are candidates. Among
/// them a one-to-one assignment is chosen that matches as many regions as
/// possible and, among those, has the largest total IoU. Matched regions
/// take the previous id; the others take ids from a
/// [`LabelReservoir`] of `1..=n` (n = number of current regions) minus the
/// matched ids, in ascending order of their current id.
///
/// # Errors
///
/// Returns an error if the shapes differ or the threshold is negative or NaN.
pub fn match_pair(
    previous: &LabelField,
    current: &LabelField,
    iou_threshold: f64,
) -> RegionResult<LabelField> {
    check_shape("current field", previous.shape(), current.shape())?;
    check_threshold("IoU threshold", iou_threshold)?;

    let prev_areas = label_areas(previous);
    let curr_areas = label_areas(current);
    if curr_areas.is_empty() {
        return Ok(LabelField::zeros(current.raw_dim()));
    }

    let mut overlaps: HashMap<(u32, u32), usize> = HashMap::new();
    for (&p, &c) in previous.iter().zip(current.iter()) {
        if p != 0 && c != 0 {
            *overlaps.entry((p, c)).or_insert(0) += 1;
        }
    }

    let candidates: Vec<Edge> = overlaps
        .into_iter()
        .map(|((p, c), inter)| {
            let union = prev_areas[&p] + curr_areas[&c] - inter;
            (p, c, inter as f64 / union as f64)
        })
        .filter(|&(_, _, iou)| iou >= iou_threshold)
        .collect();

    let pairs = assign(&candidates);
    let used_previous: Vec<u32> = pairs.iter().map(|&(p, _)| p).collect();
    let mut assigned: BTreeMap<u32, u32> = pairs.into_iter().map(|(p, c)| (c, p)).collect();
    let matched = assigned.len();

    let region_count = u32::try_from(curr_areas.len()).map_err(|_| RegionError::LabelOverflow)?;
    let max_seen = max_label(previous).max(max_label(current));
    let mut reservoir = LabelReservoir::new(region_count, used_previous, max_seen);
    for &c in curr_areas.keys() {
        if !assigned.contains_key(&c) {
            let id = reservoir.pop()?;
            assigned.insert(c, id);
        }
    }
    debug!(
        regions = curr_areas.len(),
        matched,
        minted = reservoir.minted(),
        "matched label field"
    );

    Ok(current.mapv(|v| if v == 0 { 0 } else { assigned[&v] }))
}

/// Streaming IoU matcher over an ordered sequence of label fields
///
/// The first field is committed unchanged; every later field is matched
/// against the last committed one.
#[derive(Debug, Clone, Default)]
pub struct SequentialLabelMatcher {
    options: MatchOptions,
    previous: Option<LabelField>,
}

impl SequentialLabelMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self {
            options,
            previous: None,
        }
    }

    /// The last committed field
    pub fn previous(&self) -> Option<&LabelField> {
        self.previous.as_ref()
    }

    /// Match `field` against the last committed field and commit the result
    pub fn push(&mut self, field: &LabelField) -> RegionResult<LabelField> {
        let committed = match &self.previous {
            None => field.clone(),
            Some(previous) => match_pair(previous, field, self.options.iou_threshold)?,
        };
        self.previous = Some(committed.clone());
        Ok(committed)
    }
}

/// Match every field against its committed predecessor
///
/// # Returns
///
/// One field per input. The first is unchanged; a field without regions
/// comes back all background.
///
/// # Errors
///
/// Returns an error if consecutive shapes differ.
pub fn match_sequence(fields: &[LabelField], iou_threshold: f64) -> RegionResult<Vec<LabelField>> {
    let mut matcher =
        SequentialLabelMatcher::new(MatchOptions::new().with_iou_threshold(iou_threshold));
    fields.iter().map(|f| matcher.push(f)).collect()
}

/// Previous-region centroid stored in the R-tree
#[derive(Debug, Clone, Copy)]
struct CentroidEntry {
    point: [f64; 3],
    label: u32,
}

impl rstar::RTreeObject for CentroidEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl rstar::PointDistance for CentroidEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.point
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

fn padded(centroid: &[f64]) -> RegionResult<[f64; 3]> {
    if centroid.len() > 3 {
        return Err(RegionError::InvalidParameters(format!(
            "centroid matching supports up to 3 axes, got {}",
            centroid.len()
        )));
    }
    let mut point = [0.0; 3];
    point[..centroid.len()].copy_from_slice(centroid);
    Ok(point)
}

/// Renumber `current` by nearest previous centroid
///
/// Every region of `current` whose centroid lies within `max_distance` of the
/// nearest previous centroid takes that previous region's id. Regions farther
/// away get fresh ids above every id in either field, in ascending order of
/// their current id. Several current regions may take the same previous id.
///
/// # Errors
///
/// Returns an error if the shapes differ, the fields have more than 3 axes,
/// or `max_distance` is negative or NaN.
pub fn match_centroids(
    previous: &LabelField,
    current: &LabelField,
    max_distance: f64,
) -> RegionResult<LabelField> {
    check_shape("current field", previous.shape(), current.shape())?;
    check_threshold("centroid distance", max_distance)?;

    let entries = region_props(previous)?
        .into_iter()
        .map(|r| {
            Ok(CentroidEntry {
                point: padded(&r.centroid)?,
                label: r.label,
            })
        })
        .collect::<RegionResult<Vec<_>>>()?;
    let tree = RTree::bulk_load(entries);

    let mut next_fresh = max_label(previous).max(max_label(current));
    let mut assigned: HashMap<u32, u32> = HashMap::new();
    let mut fresh = 0usize;
    for region in region_props(current)? {
        let query = padded(&region.centroid)?;
        let matched = tree
            .nearest_neighbor(&query)
            .filter(|e| rstar::PointDistance::distance_2(*e, &query).sqrt() <= max_distance)
            .map(|e| e.label);
        let id = match matched {
            Some(label) => label,
            None => {
                next_fresh = next_fresh.checked_add(1).ok_or(RegionError::LabelOverflow)?;
                fresh += 1;
                next_fresh
            }
        };
        assigned.insert(region.label, id);
    }
    debug!(regions = assigned.len(), fresh, "matched label field by centroid");

    Ok(current.mapv(|v| if v == 0 { 0 } else { assigned[&v] }))
}

fn split_volume(volume: &LabelField) -> RegionResult<Vec<LabelField>> {
    if volume.ndim() < 2 {
        return Err(RegionError::InvalidParameters(format!(
            "volume needs at least 2 axes, got {}",
            volume.ndim()
        )));
    }
    Ok(volume.axis_iter(Axis(0)).map(|s| s.to_owned()).collect())
}

fn stack_volume(volume: &LabelField, slices: &[LabelField]) -> RegionResult<LabelField> {
    if slices.is_empty() {
        return Ok(volume.clone());
    }
    let views: Vec<_> = slices.iter().map(|s| s.view()).collect();
    Ok(stack(Axis(0), &views).map_err(vollseg_core::Error::from)?)
}

/// Apply [`match_sequence`] to the slices along axis 0 of a volume
pub fn match_volume(volume: &LabelField, iou_threshold: f64) -> RegionResult<LabelField> {
    let slices = split_volume(volume)?;
    let matched = match_sequence(&slices, iou_threshold)?;
    stack_volume(volume, &matched)
}

/// Apply [`match_centroids`] slice by slice along axis 0 of a volume
///
/// Each slice is matched against the already relabeled slice before it.
pub fn merge_labels_across_volume(
    volume: &LabelField,
    max_distance: f64,
) -> RegionResult<LabelField> {
    let slices = split_volume(volume)?;
    let mut merged: Vec<LabelField> = Vec::with_capacity(slices.len());
    for slice in slices {
        let next = match merged.last() {
            None => slice,
            Some(previous) => match_centroids(previous, &slice, max_distance)?,
        };
        merged.push(next);
    }
    stack_volume(volume, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{IxDyn, array};

    #[test]
    fn test_reservoir_ascending_then_fresh() {
        let mut r = LabelReservoir::new(4, [2, 3], 9);
        assert_eq!(r.len(), 2);
        assert_eq!(r.pop().unwrap(), 1);
        assert_eq!(r.pop().unwrap(), 4);
        assert!(r.is_empty());
        assert_eq!(r.pop().unwrap(), 10);
        assert_eq!(r.pop().unwrap(), 11);
        assert_eq!(r.minted(), 2);
    }

    #[test]
    fn test_match_pair_takes_previous_ids() {
        let previous = array![[7u32, 7, 0, 9, 9]].into_dyn();
        let current = array![[1u32, 1, 0, 2, 2]].into_dyn();
        let out = match_pair(&previous, &current, 0.5).unwrap();
        assert_eq!(out, previous);
    }

    #[test]
    fn test_unmatched_region_uses_reservoir() {
        let previous = array![[1u32, 1, 0, 0, 0, 0]].into_dyn();
        let current = array![[5u32, 5, 0, 0, 8, 8]].into_dyn();
        let out = match_pair(&previous, &current, 0.5).unwrap();
        // Region 5 matches 1; region 8 takes the smallest free id
        assert_eq!(out, array![[1u32, 1, 0, 0, 2, 2]].into_dyn());
    }

    #[test]
    fn test_assignment_prefers_higher_iou() {
        // Current region 1 overlaps previous 3 fully and previous 4 partly
        let previous = array![[3u32, 3, 4, 4, 4, 4]].into_dyn();
        let current = array![[1u32, 1, 1, 2, 2, 2]].into_dyn();
        let out = match_pair(&previous, &current, 0.3).unwrap();
        assert_eq!(out, array![[3u32, 3, 3, 4, 4, 4]].into_dyn());
    }

    #[test]
    fn test_assignment_maximises_matched_pairs() {
        // Pairing current 1 with previous 1 (IoU 5/11) would leave both 2s unmatched
        let previous = array![[2u32, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0]].into_dyn();
        let current = array![[1u32, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 0, 0]].into_dyn();
        let out = match_pair(&previous, &current, 0.25).unwrap();
        assert_eq!(
            out,
            array![[2u32, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 0, 0]].into_dyn()
        );
    }

    #[test]
    fn test_empty_current_field() {
        let previous = array![[1u32, 1]].into_dyn();
        let current = array![[0u32, 0]].into_dyn();
        assert_eq!(match_pair(&previous, &current, 0.5).unwrap(), current);
    }

    #[test]
    fn test_match_sequence_chains() {
        let fields = vec![
            array![[4u32, 4, 0, 0]].into_dyn(),
            array![[0u32, 1, 1, 0]].into_dyn(),
            array![[0u32, 0, 2, 2]].into_dyn(),
        ];
        let out = match_sequence(&fields, 0.3).unwrap();
        assert_eq!(out[0], fields[0]);
        assert_eq!(out[1], array![[0u32, 4, 4, 0]].into_dyn());
        assert_eq!(out[2], array![[0u32, 0, 4, 4]].into_dyn());
    }

    #[test]
    fn test_shape_mismatch() {
        let fields = vec![
            LabelField::zeros(IxDyn(&[2, 2])),
            LabelField::zeros(IxDyn(&[2, 3])),
        ];
        assert!(match_sequence(&fields, 0.5).is_err());
    }

    #[test]
    fn test_match_centroids() {
        let previous = array![[0u32, 6, 6, 0, 0, 0, 0, 0, 0, 0]].into_dyn();
        let current = array![[0u32, 0, 1, 1, 0, 0, 0, 0, 2, 2]].into_dyn();
        let out = match_centroids(&previous, &current, 3.0).unwrap();
        // Region 1 is one pixel from region 6; region 2 is too far
        assert_eq!(out, array![[0u32, 0, 6, 6, 0, 0, 0, 0, 7, 7]].into_dyn());
    }

    #[test]
    fn test_match_centroids_empty_previous() {
        let previous = LabelField::zeros(IxDyn(&[1, 4]));
        let current = array![[0u32, 3, 0, 0]].into_dyn();
        let out = match_centroids(&previous, &current, 3.0).unwrap();
        assert_eq!(out, array![[0u32, 4, 0, 0]].into_dyn());
    }

    #[test]
    fn test_match_volume() {
        let volume = array![[[1u32, 1, 0]], [[0, 5, 5]]].into_dyn();
        let out = match_volume(&volume, 0.3).unwrap();
        assert_eq!(out, array![[[1u32, 1, 0]], [[0, 1, 1]]].into_dyn());
    }

    #[test]
    fn test_merge_labels_across_volume() {
        let volume = array![[[2u32, 2, 0, 0]], [[0, 9, 9, 0]], [[0, 0, 9, 9]]].into_dyn();
        let out = merge_labels_across_volume(&volume, 1.5).unwrap();
        assert_eq!(out, array![[[2u32, 2, 0, 0]], [[0, 2, 2, 0]], [[0, 0, 2, 2]]].into_dyn());
    }

    #[test]
    fn test_volume_needs_two_axes() {
        let volume = array![1u32, 2].into_dyn();
        assert!(match_volume(&volume, 0.5).is_err());
    }
}
