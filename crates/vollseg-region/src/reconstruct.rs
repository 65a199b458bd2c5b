//! Marker-constrained watershed reconstruction
//!
//! Fuses a semantic mask, a cost field and an instance-label field into one
//! consistent label field:
//!
//! 1. Instance regions the mask missed are forced into (a copy of) the mask.
//! 2. Seeds are taken from instance centroids, plus, optionally, the
//!    centroids of mask components no instance seed accounts for.
//! 3. A sentinel seed is appended at the origin.
//! 4. Seeds become dilated markers, numbered `1 + arrival index`.
//! 5. The negated cost is flooded from the markers inside the mask.
//! 6. Duplicates are suppressed and per-instance holes are filled.
//!
//! Which regions count as "missed" is decided by a [`DistinctnessOracle`], and
//! how duplicates are merged by a [`RegionSuppressor`]; both are injected.

use crate::conncomp::{label_components, relabel_components};
use crate::error::{RegionError, RegionResult};
use crate::holes::fill_label_holes;
use crate::oracle::{BoxContainmentOracle, DistinctnessOracle};
use crate::suppress::{BoxOverlapSuppressor, RegionSuppressor};
use crate::watershed::{WatershedOptions, watershed_from_maxima};
use std::collections::BTreeSet;
use tracing::debug;
use vollseg_core::{
    Connectivity, CostField, Grid, LabelField, Mask, RegionProps, Seed, SeedSource, check_shape,
    from_flat, region_props, to_flat,
};
use vollseg_morph::{Sel, dilate_labels};

/// Radius of the ball each seed marker is dilated with
pub const MARKER_RADIUS: usize = 2;

/// Default bounding-box overlap at which two regions are duplicates
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

/// Default centroid distance along axis 0 within which 3-D duplicates merge
pub const DEFAULT_Z_WINDOW: usize = 1;

/// Options for watershed reconstruction
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Add seeds for mask components that no instance seed accounts for
    pub recover_missed_seeds: bool,
    /// Overlap threshold passed to the suppressor
    pub overlap_threshold: f64,
    /// Axis-0 window passed to the suppressor
    pub z_window: usize,
    /// Radius of the marker dilation
    pub marker_radius: usize,
    /// Connectivity used while flooding
    pub connectivity: Connectivity,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            recover_missed_seeds: true,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            z_window: DEFAULT_Z_WINDOW,
            marker_radius: MARKER_RADIUS,
            connectivity: Connectivity::Face,
        }
    }
}

impl ReconstructOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable recovery of seeds from mask-only components
    pub fn with_recover_missed_seeds(mut self, recover: bool) -> Self {
        self.recover_missed_seeds = recover;
        self
    }

    /// Set the suppression overlap threshold
    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    /// Set the suppression axis-0 window
    pub fn with_z_window(mut self, z_window: usize) -> Self {
        self.z_window = z_window;
        self
    }

    /// Set the marker dilation radius
    pub fn with_marker_radius(mut self, radius: usize) -> Self {
        self.marker_radius = radius;
        self
    }

    /// Set flooding connectivity
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }
}

/// Everything a reconstruction produced
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Final label field
    pub labels: LabelField,
    /// Dilated marker field the flood started from
    pub markers: LabelField,
    /// Realized seeds; seed `i` became marker id `i + 1`
    pub seeds: Vec<Seed>,
    /// Mask after instance regions were forced into it
    pub mask: Mask,
}

/// Marker-constrained watershed reconstructor
///
/// Holds the injected strategies and the options; every call is independent.
#[derive(Debug, Clone)]
pub struct Reconstructor<O = BoxContainmentOracle, S = BoxOverlapSuppressor> {
    oracle: O,
    suppressor: S,
    options: ReconstructOptions,
}

impl Reconstructor {
    /// Reconstructor with the box-containment oracle and box-overlap suppressor
    pub fn new(options: ReconstructOptions) -> Self {
        Self::with_strategies(BoxContainmentOracle, BoxOverlapSuppressor, options)
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(ReconstructOptions::default())
    }
}

impl<O: DistinctnessOracle, S: RegionSuppressor> Reconstructor<O, S> {
    /// Reconstructor with custom strategies
    pub fn with_strategies(oracle: O, suppressor: S, options: ReconstructOptions) -> Self {
        Self {
            oracle,
            suppressor,
            options,
        }
    }

    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Reconstruct a label field from a mask, a cost field and instance labels
    ///
    /// # Errors
    ///
    /// Returns an error if the input shapes differ.
    pub fn reconstruct(
        &self,
        mask: &Mask,
        cost: &CostField,
        instance_labels: &LabelField,
    ) -> RegionResult<LabelField> {
        Ok(self.reconstruct_detailed(mask, cost, instance_labels)?.labels)
    }

    /// Like [`Reconstructor::reconstruct`], also returning markers, seeds and
    /// the updated mask
    ///
    /// The output never labels a pixel outside the updated mask. An all-false
    /// input mask yields an all-background result without seeds.
    pub fn reconstruct_detailed(
        &self,
        mask: &Mask,
        cost: &CostField,
        instance_labels: &LabelField,
    ) -> RegionResult<Reconstruction> {
        check_shape("cost field", mask.shape(), cost.shape())?;
        check_shape("instance labels", mask.shape(), instance_labels.shape())?;
        let grid = Grid::of(mask)?;

        if !mask.iter().any(|&m| m) {
            debug!("empty mask, nothing to reconstruct");
            let empty = LabelField::zeros(mask.raw_dim());
            return Ok(Reconstruction {
                labels: empty.clone(),
                markers: empty,
                seeds: Vec::new(),
                mask: mask.clone(),
            });
        }

        let instances = region_props(instance_labels)?;
        let mut updated = mask.clone();
        let mut mask_regions = mask_components(&updated)?;

        // Force instance regions the mask missed into the mask
        let mask_centroids = centroids(&mask_regions);
        let forced: BTreeSet<u32> = instances
            .iter()
            .filter(|r| self.oracle.is_distinct_from_all(&r.bbox, &mask_centroids))
            .map(|r| r.label)
            .collect();
        if !forced.is_empty() {
            ndarray::Zip::from(&mut updated)
                .and(instance_labels)
                .for_each(|m, l| {
                    if forced.contains(l) {
                        *m = true;
                    }
                });
            mask_regions = mask_components(&updated)?;
        }

        let mut seeds: Vec<Seed> = instances
            .iter()
            .map(|r| Seed::new(r.centroid.clone(), SeedSource::Instance))
            .collect();
        let instance_seeds = seeds.len();

        if self.options.recover_missed_seeds {
            for region in &mask_regions {
                let points: Vec<Vec<f64>> = seeds.iter().map(|s| s.point.clone()).collect();
                if self.oracle.is_distinct_from_all(&region.bbox, &points) {
                    seeds.push(Seed::new(region.centroid.clone(), SeedSource::Mask));
                }
            }
        }
        seeds.push(Seed::sentinel(grid.ndim()));

        debug!(
            instances = instance_seeds,
            recovered = seeds.len() - instance_seeds - 1,
            forced = forced.len(),
            mask_regions = mask_regions.len(),
            "built watershed seeds"
        );

        let markers = self.markers(&grid, &seeds)?;
        let flooded = watershed_from_maxima(
            cost,
            &markers,
            Some(&updated),
            &WatershedOptions::new().with_connectivity(self.options.connectivity),
        )?;
        let suppressed = self.suppressor.suppress(
            &flooded,
            self.options.overlap_threshold,
            self.options.z_window,
        )?;
        let mut labels = fill_label_holes(&suppressed)?;
        ndarray::Zip::from(&mut labels)
            .and(&updated)
            .for_each(|l, &m| {
                if !m {
                    *l = 0;
                }
            });

        Ok(Reconstruction {
            labels,
            markers,
            seeds,
            mask: updated,
        })
    }

    /// Fuse instance seeds into labels another pass already claimed
    ///
    /// `claimed` is suppressed first. Centroids of `seeds` regions that fall on
    /// claimed background (coordinates truncated) become markers, the
    /// negated `cost` is flooded inside `mask`, and the flood's holes are
    /// filled. With `recover_missed_seeds` enabled the flood fills the
    /// claimed background. The union is split into connected components and
    /// suppressed again.
    pub fn fuse(
        &self,
        claimed: &LabelField,
        seeds: &LabelField,
        mask: &Mask,
        cost: &CostField,
    ) -> RegionResult<LabelField> {
        Ok(self.fuse_detailed(claimed, seeds, mask, cost)?.labels)
    }

    /// Like [`Reconstructor::fuse`], also returning markers and seeds
    pub fn fuse_detailed(
        &self,
        claimed: &LabelField,
        seeds: &LabelField,
        mask: &Mask,
        cost: &CostField,
    ) -> RegionResult<Reconstruction> {
        check_shape("seeds", claimed.shape(), seeds.shape())?;
        check_shape("mask", claimed.shape(), mask.shape())?;
        check_shape("cost field", claimed.shape(), cost.shape())?;
        let grid = Grid::of(claimed)?;

        let claimed = self.suppressor.suppress(
            claimed,
            self.options.overlap_threshold,
            self.options.z_window,
        )?;
        let claimed_flat = to_flat(&claimed);

        let mut kept: Vec<Seed> = Vec::new();
        for region in region_props(seeds)? {
            let coords: Vec<usize> = region
                .centroid
                .iter()
                .zip(grid.shape())
                .map(|(&c, &n)| (c.max(0.0) as usize).min(n - 1))
                .collect();
            if claimed_flat[grid.index(&coords)] == 0 {
                kept.push(Seed::new(region.centroid, SeedSource::Instance));
            }
        }
        kept.push(Seed::sentinel(grid.ndim()));
        debug!(kept = kept.len() - 1, "fusing unclaimed seeds");

        let markers = self.markers(&grid, &kept)?;
        let flooded = watershed_from_maxima(
            cost,
            &markers,
            Some(mask),
            &WatershedOptions::new().with_connectivity(self.options.connectivity),
        )?;
        let flooded = fill_label_holes(&flooded)?;

        let combined = if self.options.recover_missed_seeds {
            ndarray::Zip::from(&claimed)
                .and(&flooded)
                .map_collect(|&c, &f| if c == 0 { f } else { c })
        } else {
            claimed
        };
        let split = relabel_components(&combined, Connectivity::Full)?;
        let labels = self.suppressor.suppress(
            &split,
            self.options.overlap_threshold,
            self.options.z_window,
        )?;

        Ok(Reconstruction {
            labels,
            markers,
            seeds: kept,
            mask: mask.clone(),
        })
    }

    /// Stamp seed `i` as id `i + 1` at its rounded coordinate and dilate
    fn markers(&self, grid: &Grid, seeds: &[Seed]) -> RegionResult<LabelField> {
        if seeds.len() >= u32::MAX as usize {
            return Err(RegionError::LabelOverflow);
        }
        let mut raw = vec![0u32; grid.len()];
        for (i, seed) in seeds.iter().enumerate() {
            let coords = seed.rounded(grid.shape())?;
            raw[grid.index(&coords)] = i as u32 + 1;
        }
        let raw = from_flat(grid.shape(), raw)?;
        if self.options.marker_radius == 0 {
            return Ok(raw);
        }
        let sel = Sel::create_ball(self.options.marker_radius, grid.ndim())?;
        Ok(dilate_labels(&raw, &sel)?)
    }
}

fn mask_components(mask: &Mask) -> RegionResult<Vec<RegionProps>> {
    Ok(region_props(&label_components(mask, Connectivity::Full)?)?)
}

fn centroids(regions: &[RegionProps]) -> Vec<Vec<f64>> {
    regions.iter().map(|r| r.centroid.clone()).collect()
}

/// Reconstruct with the default strategies
///
/// # Arguments
///
/// * `mask` - Admissible foreground
/// * `cost` - Flooding source; higher is more interior
/// * `instance_labels` - Raw instance labels from a detector
/// * `recover_missed_seeds` - Seed mask components no instance accounts for
/// * `overlap_threshold` - Duplicate suppression overlap
/// * `z_window` - Duplicate suppression axis-0 window
pub fn reconstruct(
    mask: &Mask,
    cost: &CostField,
    instance_labels: &LabelField,
    recover_missed_seeds: bool,
    overlap_threshold: f64,
    z_window: usize,
) -> RegionResult<LabelField> {
    let options = ReconstructOptions::new()
        .with_recover_missed_seeds(recover_missed_seeds)
        .with_overlap_threshold(overlap_threshold)
        .with_z_window(z_window);
    Reconstructor::new(options).reconstruct(mask, cost, instance_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppress::NoSuppression;
    use ndarray::{IxDyn, array};

    fn disk(shape: [usize; 2], center: [f64; 2], radius: f64) -> Mask {
        ndarray::Array2::from_shape_fn(shape, |(y, x)| {
            (y as f64 - center[0]).powi(2) + (x as f64 - center[1]).powi(2) <= radius * radius
        })
        .into_dyn()
    }

    fn bump(shape: [usize; 2], centers: &[[f64; 2]]) -> CostField {
        ndarray::Array2::from_shape_fn(shape, |(y, x)| {
            centers
                .iter()
                .map(|c| {
                    let d2 = (y as f64 - c[0]).powi(2) + (x as f64 - c[1]).powi(2);
                    (1.0 / (1.0 + d2)) as f32
                })
                .fold(0.0f32, f32::max)
        })
        .into_dyn()
    }

    #[test]
    fn test_empty_mask_yields_background() {
        let mask = Mask::from_elem(IxDyn(&[6, 6]), false);
        let cost = CostField::zeros(IxDyn(&[6, 6]));
        let mut instances = LabelField::zeros(IxDyn(&[6, 6]));
        instances[[3, 3]] = 1;
        let out = Reconstructor::default()
            .reconstruct_detailed(&mask, &cost, &instances)
            .unwrap();
        assert!(out.labels.iter().all(|&v| v == 0));
        assert!(out.seeds.is_empty());
    }

    #[test]
    fn test_recovers_second_disk() {
        let shape = [20, 30];
        let a = disk(shape, [10.0, 8.0], 4.0);
        let b = disk(shape, [10.0, 22.0], 4.0);
        let mask = &a | &b;
        let cost = bump(shape, &[[10.0, 8.0], [10.0, 22.0]]);
        let instances = a.mapv(|v| v as u32);

        let out = Reconstructor::default()
            .reconstruct_detailed(&mask, &cost, &instances)
            .unwrap();
        let regions = region_props(&out.labels).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(out.seeds.len(), 3);
        assert_eq!(out.seeds[1].source, SeedSource::Mask);
        assert_eq!(out.seeds[2].source, SeedSource::Sentinel);
        assert_ne!(out.labels[[10, 8]], out.labels[[10, 22]]);
    }

    #[test]
    fn test_without_recovery_one_seed_floods_mask_component() {
        let shape = [20, 30];
        let a = disk(shape, [10.0, 8.0], 4.0);
        let b = disk(shape, [10.0, 22.0], 4.0);
        let mask = &a | &b;
        let cost = bump(shape, &[[10.0, 8.0], [10.0, 22.0]]);
        let instances = a.mapv(|v| v as u32);

        let out = reconstruct(&mask, &cost, &instances, false, 0.3, 1).unwrap();
        // The second disk is a separate component with no marker
        assert_eq!(out[[10, 22]], 0);
        assert_eq!(out[[10, 8]], 1);
    }

    #[test]
    fn test_missed_instance_forced_into_mask() {
        let shape = [12, 12];
        let mask = disk(shape, [3.0, 3.0], 2.0);
        let missed = disk(shape, [8.0, 8.0], 2.0);
        let instances = missed.mapv(|v| v as u32 * 5);
        let cost = bump(shape, &[[3.0, 3.0], [8.0, 8.0]]);

        let out = Reconstructor::default()
            .reconstruct_detailed(&mask, &cost, &instances)
            .unwrap();
        assert!(out.mask[[8, 8]]);
        assert_ne!(out.labels[[8, 8]], 0);
        assert_ne!(out.labels[[3, 3]], 0);
    }

    #[test]
    fn test_output_inside_updated_mask() {
        let mask = array![[false, false, false, true, true, true, false, false, false]].into_dyn();
        let cost = array![[0.0f32, 0.0, 0.0, 0.5, 1.0, 0.5, 0.0, 0.0, 0.0]].into_dyn();
        let instances = array![[0u32, 0, 0, 0, 1, 0, 0, 0, 0]].into_dyn();
        let out = Reconstructor::with_strategies(
            BoxContainmentOracle,
            NoSuppression,
            ReconstructOptions::new(),
        )
        .reconstruct_detailed(&mask, &cost, &instances)
        .unwrap();
        assert_eq!(out.labels, array![[0u32, 0, 0, 1, 1, 1, 0, 0, 0]].into_dyn());
        // The sentinel marker lies outside the mask and floods nothing
        assert_eq!(out.markers[[0, 0]], 2);
    }

    #[test]
    fn test_sentinel_marker_overrides_seed_near_origin() {
        let mask = array![[true, true, true, false, false, false, false, false, false]].into_dyn();
        let cost = array![[1.0f32, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]].into_dyn();
        let instances = array![[0u32, 1, 0, 0, 0, 0, 0, 0, 0]].into_dyn();
        let out = Reconstructor::with_strategies(
            BoxContainmentOracle,
            NoSuppression,
            ReconstructOptions::new(),
        )
        .reconstruct_detailed(&mask, &cost, &instances)
        .unwrap();
        assert_eq!(out.seeds.len(), 2);
        // Overlapping balls keep the larger id, and the sentinel is last
        assert_eq!(
            out.markers,
            array![[2u32, 2, 2, 1, 0, 0, 0, 0, 0]].into_dyn()
        );
        assert_eq!(out.labels, array![[2u32, 2, 2, 0, 0, 0, 0, 0, 0]].into_dyn());
    }

    #[test]
    fn test_shape_mismatch() {
        let mask = Mask::from_elem(IxDyn(&[3, 3]), true);
        let cost = CostField::zeros(IxDyn(&[3, 4]));
        let instances = LabelField::zeros(IxDyn(&[3, 3]));
        assert!(Reconstructor::default().reconstruct(&mask, &cost, &instances).is_err());
    }

    #[test]
    fn test_fuse_adds_unclaimed_seed() {
        let shape = [20, 30];
        let a = disk(shape, [10.0, 8.0], 4.0);
        let b = disk(shape, [10.0, 22.0], 4.0);
        let mask = &a | &b;
        let cost = bump(shape, &[[10.0, 8.0], [10.0, 22.0]]);

        let claimed = a.mapv(|v| v as u32 * 3);
        let mut seeds = (&a | &b).mapv(|v| v as u32);
        ndarray::Zip::from(&mut seeds).and(&b).for_each(|s, &in_b| {
            if in_b {
                *s = 2;
            }
        });

        let out = Reconstructor::default()
            .fuse_detailed(&claimed, &seeds, &mask, &cost)
            .unwrap();
        // Seed 1 sits on claimed pixels, seed 2 does not
        assert_eq!(out.seeds.len(), 2);
        let regions = region_props(&out.labels).unwrap();
        assert_eq!(regions.len(), 2);
        assert_ne!(out.labels[[10, 22]], 0);
        assert_ne!(out.labels[[10, 8]], out.labels[[10, 22]]);
    }

    #[test]
    fn test_fuse_without_recovery_keeps_claimed_only() {
        let shape = [20, 30];
        let a = disk(shape, [10.0, 8.0], 4.0);
        let b = disk(shape, [10.0, 22.0], 4.0);
        let mask = &a | &b;
        let cost = bump(shape, &[[10.0, 8.0], [10.0, 22.0]]);
        let claimed = a.mapv(|v| v as u32 * 3);
        let seeds = b.mapv(|v| v as u32);

        let out = Reconstructor::new(ReconstructOptions::new().with_recover_missed_seeds(false))
            .fuse(&claimed, &seeds, &mask, &cost)
            .unwrap();
        assert_eq!(out[[10, 22]], 0);
        assert_eq!(out[[10, 8]], 1);
    }
}
