//! Label cleanup
//!
//! Size filtering and id compaction for label fields.

use crate::error::{RegionError, RegionResult};
use std::collections::HashMap;
use tracing::trace;
use vollseg_core::{LabelField, label_areas};

/// Renumber ids to `1..=n` in ascending order of the old ids
///
/// # Returns
///
/// The relabeled field and the `(old, new)` pairs, sorted by old id.
pub fn relabel_sequential(field: &LabelField) -> RegionResult<(LabelField, Vec<(u32, u32)>)> {
    let mut mapping = Vec::new();
    for (i, &old) in label_areas(field).keys().enumerate() {
        let new = u32::try_from(i + 1).map_err(|_| RegionError::LabelOverflow)?;
        mapping.push((old, new));
    }
    let lookup: HashMap<u32, u32> = mapping.iter().copied().collect();
    let relabeled = field.mapv(|v| lookup.get(&v).copied().unwrap_or(0));
    Ok((relabeled, mapping))
}

fn remove_where(field: &LabelField, drop: impl Fn(usize) -> bool) -> LabelField {
    let removed: Vec<u32> = label_areas(field)
        .into_iter()
        .filter(|&(_, area)| drop(area))
        .map(|(label, _)| label)
        .collect();
    trace!(removed = removed.len(), "removed regions by size");
    if removed.is_empty() {
        return field.clone();
    }
    field.mapv(|v| if removed.binary_search(&v).is_ok() { 0 } else { v })
}

/// Zero out every region with more than `max_size` pixels
pub fn remove_big_objects(field: &LabelField, max_size: usize) -> LabelField {
    remove_where(field, |area| area > max_size)
}

/// Zero out every region with fewer than `min_size` pixels
pub fn remove_small_objects(field: &LabelField, min_size: usize) -> LabelField {
    remove_where(field, |area| area < min_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relabel_sequential() {
        let field = array![[9u32, 0, 4], [4, 20, 0]].into_dyn();
        let (out, mapping) = relabel_sequential(&field).unwrap();
        assert_eq!(out, array![[2u32, 0, 1], [1, 3, 0]].into_dyn());
        assert_eq!(mapping, vec![(4, 1), (9, 2), (20, 3)]);
    }

    #[test]
    fn test_remove_big_objects() {
        let field = array![1u32, 1, 1, 2, 0, 3, 3].into_dyn();
        assert_eq!(remove_big_objects(&field, 2), array![0u32, 0, 0, 2, 0, 3, 3].into_dyn());
        assert_eq!(remove_big_objects(&field, 3), field);
    }

    #[test]
    fn test_remove_small_objects() {
        let field = array![1u32, 1, 1, 2, 0, 3, 3].into_dyn();
        assert_eq!(remove_small_objects(&field, 2), array![1u32, 1, 1, 0, 0, 3, 3].into_dyn());
        assert_eq!(remove_small_objects(&field, 0), field);
    }
}
