//! Connected component analysis
//!
//! This module provides functions for finding and labeling connected components
//! in N-d masks and label fields. It uses a Union-Find (disjoint set) data
//! structure for efficient labeling.

use crate::error::{RegionError, RegionResult};
use vollseg_core::{Connectivity, Grid, LabelField, Mask, from_flat, to_flat};

/// Disjoint sets over linear array indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        // The smaller index stays root so roots are first-in-raster-order pixels
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Two-pass labeling over a flat buffer
///
/// `joins(a, b)` decides whether two foreground neighbors belong together.
/// Components get ids `1..=n` in raster order of their first pixel.
fn label_flat<T: Copy>(
    grid: &Grid,
    values: &[T],
    connectivity: Connectivity,
    is_foreground: impl Fn(T) -> bool,
    joins: impl Fn(T, T) -> bool,
) -> RegionResult<(Vec<u32>, u32)> {
    let hood = grid.neighborhood(connectivity);
    let mut sets = UnionFind::new(grid.len());
    let mut scratch = vec![0usize; grid.ndim()];
    let mut neighbors = Vec::with_capacity(hood.len());

    for index in 0..grid.len() {
        let v = values[index];
        if !is_foreground(v) {
            continue;
        }
        grid.neighbors(index, &hood, &mut scratch, &mut neighbors);
        for &n in neighbors.iter().filter(|&&n| n < index) {
            let w = values[n];
            if is_foreground(w) && joins(v, w) {
                sets.union(index, n);
            }
        }
    }

    let mut ids = vec![0u32; grid.len()];
    let mut out = vec![0u32; grid.len()];
    let mut count = 0u32;
    for index in 0..grid.len() {
        if !is_foreground(values[index]) {
            continue;
        }
        let root = sets.find(index);
        if ids[root] == 0 {
            count = count.checked_add(1).ok_or(RegionError::LabelOverflow)?;
            ids[root] = count;
        }
        out[index] = ids[root];
    }

    Ok((out, count))
}

/// Label the connected components of a mask
///
/// # Arguments
///
/// * `mask` - Input mask
/// * `connectivity` - Neighborhood that joins foreground pixels
///
/// # Returns
///
/// A label field with ids `1..=n`, numbered in raster order of each
/// component's first pixel.
pub fn label_components(mask: &Mask, connectivity: Connectivity) -> RegionResult<LabelField> {
    let grid = Grid::of(mask)?;
    let (labels, _) = label_flat(&grid, &to_flat(mask), connectivity, |v| v, |_, _| true)?;
    Ok(from_flat(grid.shape(), labels)?)
}

/// Count the connected components of a mask
pub fn count_components(mask: &Mask, connectivity: Connectivity) -> RegionResult<u32> {
    let grid = Grid::of(mask)?;
    let (_, count) = label_flat(&grid, &to_flat(mask), connectivity, |v| v, |_, _| true)?;
    Ok(count)
}

/// Split every id of a label field into its connected pieces
///
/// Neighboring pixels join only when they carry the same id. The result is
/// numbered `1..=n` in raster order, so a field whose ids are already
/// connected comes back renumbered but with the same partition.
pub fn relabel_components(
    field: &LabelField,
    connectivity: Connectivity,
) -> RegionResult<LabelField> {
    let grid = Grid::of(field)?;
    let (labels, _) = label_flat(&grid, &to_flat(field), connectivity, |v| v != 0, |a, b| a == b)?;
    Ok(from_flat(grid.shape(), labels)?)
}
