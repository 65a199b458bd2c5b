//! Per-region measurements of a label field
//!
//! [`region_props`] walks a label field once and returns, for every id, its
//! pixel count, bounding box and centroid, sorted by id.

use crate::bbox::BoundingBox;
use crate::error::Result;
use crate::field::LabelField;
use crate::grid::Grid;
use std::collections::BTreeMap;

/// Region statistics
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProps {
    /// Region id
    pub label: u32,
    /// Number of pixels
    pub area: usize,
    /// Bounding box
    pub bbox: BoundingBox,
    /// Mean pixel coordinate
    pub centroid: Vec<f64>,
}

/// Get statistics for every non-zero id of a label field
///
/// # Returns
///
/// One entry per distinct id, sorted by ascending id. An all-background
/// field yields an empty vector.
pub fn region_props(field: &LabelField) -> Result<Vec<RegionProps>> {
    let grid = Grid::of(field)?;

    struct Accum {
        area: usize,
        sums: Vec<f64>,
        bbox: BoundingBox,
    }

    let mut stats: BTreeMap<u32, Accum> = BTreeMap::new();
    let mut coords = vec![0usize; grid.ndim()];

    for (index, &label) in field.iter().enumerate() {
        if label == 0 {
            continue;
        }
        grid.coords_into(index, &mut coords);
        let acc = stats.entry(label).or_insert_with(|| Accum {
            area: 0,
            sums: vec![0.0; coords.len()],
            bbox: BoundingBox::from_coords(&coords),
        });
        acc.area += 1;
        for (sum, &c) in acc.sums.iter_mut().zip(&coords) {
            *sum += c as f64;
        }
        acc.bbox.include(&coords);
    }

    Ok(stats
        .into_iter()
        .map(|(label, acc)| RegionProps {
            label,
            area: acc.area,
            centroid: acc.sums.iter().map(|s| s / acc.area as f64).collect(),
            bbox: acc.bbox,
        })
        .collect())
}

/// Sorted distinct non-zero ids
pub fn unique_labels(field: &LabelField) -> Vec<u32> {
    let mut labels: Vec<u32> = field.iter().copied().filter(|&v| v != 0).collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Pixel count per id, sorted by id
pub fn label_areas(field: &LabelField) -> BTreeMap<u32, usize> {
    let mut areas = BTreeMap::new();
    for &label in field.iter().filter(|&&v| v != 0) {
        *areas.entry(label).or_insert(0) += 1;
    }
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_region_props_2d() {
        let field = array![
            [0u32, 5, 5, 0],
            [0, 5, 0, 0],
            [2, 0, 0, 2],
        ]
        .into_dyn();

        let props = region_props(&field).unwrap();
        assert_eq!(props.len(), 2);

        assert_eq!(props[0].label, 2);
        assert_eq!(props[0].area, 2);
        assert_eq!(props[0].bbox.min(), &[2, 0]);
        assert_eq!(props[0].bbox.max(), &[3, 4]);
        assert_eq!(props[0].centroid, vec![2.0, 1.5]);

        assert_eq!(props[1].label, 5);
        assert_eq!(props[1].area, 3);
        assert!((props[1].centroid[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((props[1].centroid[1] - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_field() {
        let field = LabelField::zeros(ndarray::IxDyn(&[3, 3, 3]));
        assert!(region_props(&field).unwrap().is_empty());
        assert!(unique_labels(&field).is_empty());
        assert!(label_areas(&field).is_empty());
    }

    #[test]
    fn test_unique_labels_and_areas() {
        let field = array![3u32, 0, 1, 3, 3].into_dyn();
        assert_eq!(unique_labels(&field), vec![1, 3]);
        let areas = label_areas(&field);
        assert_eq!(areas[&3], 3);
        assert_eq!(areas[&1], 1);
    }
}
