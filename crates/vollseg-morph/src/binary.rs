//! Binary morphological operations
//!
//! Implements erosion, dilation and hole filling for N-d boolean masks.
//! Pixels outside the array are treated as background.

use crate::{MorphError, MorphResult, Sel};
use std::collections::VecDeque;
use vollseg_core::{Connectivity, Grid, Mask, from_flat, to_flat};

fn check_sel(grid: &Grid, sel: &Sel) -> MorphResult<()> {
    if grid.ndim() != sel.ndim() {
        return Err(MorphError::InvalidParameters(format!(
            "sel is {}-d but the array is {}-d",
            sel.ndim(),
            grid.ndim()
        )));
    }
    Ok(())
}

/// Linear index of `coords + offset`, or `None` when it leaves the grid.
#[inline]
pub(crate) fn shifted(grid: &Grid, coords: &[usize], offset: &[isize]) -> Option<usize> {
    let mut index = 0usize;
    for (((&c, &o), &n), &stride) in coords
        .iter()
        .zip(offset)
        .zip(grid.shape())
        .zip(grid.strides())
    {
        let moved = c as isize + o;
        if moved < 0 || moved as usize >= n {
            return None;
        }
        index += moved as usize * stride;
    }
    Some(index)
}

/// Dilate a binary mask
///
/// Every foreground pixel stamps the SEL around itself.
pub fn dilate(mask: &Mask, sel: &Sel) -> MorphResult<Mask> {
    let grid = Grid::of(mask)?;
    check_sel(&grid, sel)?;

    let src = to_flat(mask);
    let mut dst = vec![false; grid.len()];
    let mut coords = vec![0usize; grid.ndim()];

    for (index, _) in src.iter().enumerate().filter(|(_, v)| **v) {
        grid.coords_into(index, &mut coords);
        for offset in sel.hit_offsets() {
            if let Some(target) = shifted(&grid, &coords, offset) {
                dst[target] = true;
            }
        }
    }

    Ok(from_flat(grid.shape(), dst)?)
}

/// Erode a binary mask
///
/// A pixel survives when every SEL hit lands on foreground. Hits that fall
/// outside the array count as background, so regions touching the border
/// shrink from it.
pub fn erode(mask: &Mask, sel: &Sel) -> MorphResult<Mask> {
    let grid = Grid::of(mask)?;
    check_sel(&grid, sel)?;

    let src = to_flat(mask);
    let mut dst = vec![false; grid.len()];
    let mut coords = vec![0usize; grid.ndim()];

    for (index, _) in src.iter().enumerate().filter(|(_, v)| **v) {
        grid.coords_into(index, &mut coords);
        dst[index] = sel
            .hit_offsets()
            .iter()
            .all(|offset| shifted(&grid, &coords, offset).is_some_and(|t| src[t]));
    }

    Ok(from_flat(grid.shape(), dst)?)
}

/// Erode a binary mask `iterations` times with the same SEL
pub fn erode_iterated(mask: &Mask, sel: &Sel, iterations: usize) -> MorphResult<Mask> {
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = erode(&current, sel)?;
    }
    Ok(current)
}

/// Fill holes in a binary mask
///
/// Fills interior holes (background components that do not reach the array
/// border under `connectivity`).
///
/// # Arguments
///
/// * `mask` - Input binary mask
/// * `connectivity` - Connectivity used to flood the background
///
/// # Returns
///
/// A new mask with holes filled.
pub fn fill_holes(mask: &Mask, connectivity: Connectivity) -> MorphResult<Mask> {
    let grid = Grid::of(mask)?;
    let src = to_flat(mask);
    let hood = grid.neighborhood(connectivity);

    // Mark background connected to the border
    let mut outside = vec![false; grid.len()];
    let mut queue = VecDeque::new();
    let mut coords = vec![0usize; grid.ndim()];

    for index in 0..grid.len() {
        if src[index] {
            continue;
        }
        grid.coords_into(index, &mut coords);
        let on_border = coords
            .iter()
            .zip(grid.shape())
            .any(|(&c, &n)| c == 0 || c + 1 == n);
        if on_border {
            outside[index] = true;
            queue.push_back(index);
        }
    }

    // Propagate background marker using input as mask
    let mut neighbors = Vec::with_capacity(hood.len());
    while let Some(index) = queue.pop_front() {
        grid.neighbors(index, &hood, &mut coords, &mut neighbors);
        for &n in &neighbors {
            if !src[n] && !outside[n] {
                outside[n] = true;
                queue.push_back(n);
            }
        }
    }

    // Result = input OR (NOT border-connected background)
    let filled: Vec<bool> = src
        .iter()
        .zip(&outside)
        .map(|(&fg, &out)| fg || !out)
        .collect();

    Ok(from_flat(grid.shape(), filled)?)
}
