//! Marker-based watershed
//!
//! This module floods an elevation field from labeled markers. The
//! elevation is treated as a topographic surface: pixels are claimed in
//! order of increasing elevation by whichever marker basin reaches them
//! first, so basins meet along the ridges.

use crate::error::RegionResult;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;
use vollseg_core::{Connectivity, Grid, LabelField, Mask, check_shape, from_flat, to_flat};

/// Options for marker-based watershed
#[derive(Debug, Clone, Default)]
pub struct WatershedOptions {
    /// Connectivity used to find neighbors while flooding
    pub connectivity: Connectivity,
}

impl WatershedOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connectivity type
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }
}

/// Queue entry; the heap pops the lowest elevation, then the oldest entry
#[derive(Debug, Clone, Copy)]
struct FloodEntry {
    elevation: f32,
    age: u64,
    index: usize,
}

impl Ord for FloodEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then_with(|| other.age.cmp(&self.age))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodEntry {}

/// Flood `elevation` from `markers`, optionally restricted to `mask`
///
/// # Arguments
///
/// * `elevation` - Surface to flood; low values are claimed first
/// * `markers` - Seed labels; every non-zero pixel starts a basin with its id
/// * `mask` - Pixels allowed to be labeled; `None` allows every pixel
/// * `options` - Flooding options
///
/// # Returns
///
/// A label field where every pixel reachable from a marker inside the mask
/// carries that marker's id. Markers outside the mask are discarded and
/// pixels outside the mask stay 0.
///
/// Elevation values are used as given: NaN sorts by IEEE total order, and
/// equal elevations are resolved by queue insertion order.
///
/// # Errors
///
/// Returns an error if the shapes of the inputs differ.
pub fn watershed_from_markers(
    elevation: &ndarray::ArrayD<f32>,
    markers: &LabelField,
    mask: Option<&Mask>,
    options: &WatershedOptions,
) -> RegionResult<LabelField> {
    check_shape("markers", elevation.shape(), markers.shape())?;
    if let Some(mask) = mask {
        check_shape("mask", elevation.shape(), mask.shape())?;
    }

    let grid = Grid::of(elevation)?;
    let elevation = to_flat(elevation);
    let allowed: Vec<bool> = match mask {
        Some(mask) => to_flat(mask),
        None => vec![true; grid.len()],
    };

    let mut output: Vec<u32> = to_flat(markers)
        .into_iter()
        .zip(&allowed)
        .map(|(m, &a)| if a { m } else { 0 })
        .collect();

    let mut heap = BinaryHeap::new();
    for (index, &label) in output.iter().enumerate() {
        if label != 0 {
            heap.push(FloodEntry {
                elevation: elevation[index],
                age: 0,
                index,
            });
        }
    }
    let seeded = heap.len();

    let hood = grid.neighborhood(options.connectivity);
    let mut scratch = vec![0usize; grid.ndim()];
    let mut neighbors = Vec::with_capacity(hood.len());
    let mut age = 1u64;

    while let Some(entry) = heap.pop() {
        let label = output[entry.index];
        grid.neighbors(entry.index, &hood, &mut scratch, &mut neighbors);
        for &n in &neighbors {
            if output[n] != 0 || !allowed[n] {
                continue;
            }
            output[n] = label;
            heap.push(FloodEntry {
                elevation: elevation[n],
                age,
                index: n,
            });
            age += 1;
        }
    }
    debug!(seeded, flooded = age - 1, "watershed flood complete");

    Ok(from_flat(grid.shape(), output)?)
}

/// Flood the negation of `cost`, so basins form around its maxima
pub fn watershed_from_maxima(
    cost: &ndarray::ArrayD<f32>,
    markers: &LabelField,
    mask: Option<&Mask>,
    options: &WatershedOptions,
) -> RegionResult<LabelField> {
    watershed_from_markers(&cost.mapv(|v| -v), markers, mask, options)
}
