//! Morphology on label fields
//!
//! Grey dilation is used to grow watershed markers; per-label erosion shrinks
//! every instance independently without letting neighbors bleed into each
//! other.

use crate::binary::shifted;
use crate::{MorphError, MorphResult, Sel};
use tracing::trace;
use vollseg_core::{Grid, LabelField, from_flat, to_flat};

/// Grey (max) dilation of a label field
///
/// Every non-zero pixel stamps its id over the SEL; where stamps overlap the
/// larger id wins. Background pixels never stamp.
pub fn dilate_labels(field: &LabelField, sel: &Sel) -> MorphResult<LabelField> {
    let grid = Grid::of(field)?;
    if grid.ndim() != sel.ndim() {
        return Err(MorphError::InvalidParameters(format!(
            "sel is {}-d but the field is {}-d",
            sel.ndim(),
            grid.ndim()
        )));
    }

    let src = to_flat(field);
    let mut dst = vec![0u32; grid.len()];
    let mut coords = vec![0usize; grid.ndim()];

    for (index, &label) in src.iter().enumerate() {
        if label == 0 {
            continue;
        }
        grid.coords_into(index, &mut coords);
        for offset in sel.hit_offsets() {
            if let Some(target) = shifted(&grid, &coords, offset) {
                dst[target] = dst[target].max(label);
            }
        }
    }

    Ok(from_flat(grid.shape(), dst)?)
}

/// Erode every label independently
///
/// One iteration removes each labeled pixel that has a face neighbor with a
/// different id or that lies on the array border. Regions thinner than
/// `2 * iterations + 1` pixels may vanish entirely.
///
/// # Arguments
///
/// * `field` - Input label field
/// * `iterations` - Number of erosion steps; `0` returns a copy
pub fn erode_labels(field: &LabelField, iterations: usize) -> MorphResult<LabelField> {
    let grid = Grid::of(field)?;
    let sel = Sel::create_cross(grid.ndim())?;

    let mut current = to_flat(field);
    let mut coords = vec![0usize; grid.ndim()];

    for iteration in 0..iterations {
        let mut next = vec![0u32; grid.len()];
        let mut changed = false;
        for (index, &label) in current.iter().enumerate() {
            if label == 0 {
                continue;
            }
            grid.coords_into(index, &mut coords);
            let keep = sel
                .hit_offsets()
                .iter()
                .all(|offset| shifted(&grid, &coords, offset).is_some_and(|t| current[t] == label));
            if keep {
                next[index] = label;
            } else {
                changed = true;
            }
        }
        current = next;
        if !changed {
            trace!(iteration, "label erosion reached a fixed point");
            break;
        }
    }

    Ok(from_flat(grid.shape(), current)?)
}
