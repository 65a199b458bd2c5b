//! Axis-aligned N-d bounding boxes
//!
//! A [`BoundingBox`] stores an inclusive `min` and an exclusive `max` per axis,
//! the same convention as a half-open array slice.

use crate::error::{Error, Result};
use crate::grid::Grid;

/// Per-axis extent of a region
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    min: Vec<usize>,
    max: Vec<usize>,
}

impl BoundingBox {
    /// Create a new box
    ///
    /// # Errors
    ///
    /// Returns an error if the corner lengths differ or `min > max` on some axis.
    pub fn new(min: Vec<usize>, max: Vec<usize>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(Error::DimensionMismatch {
                expected: min.len(),
                actual: max.len(),
            });
        }
        if min.iter().zip(&max).any(|(lo, hi)| lo > hi) {
            return Err(Error::InvalidParameter(format!(
                "box corners out of order: min={:?}, max={:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Box covering the single element at `coords`
    pub fn from_coords(coords: &[usize]) -> Self {
        Self {
            min: coords.to_vec(),
            max: coords.iter().map(|&c| c + 1).collect(),
        }
    }

    /// Grow the box to cover `coords`.
    pub fn include(&mut self, coords: &[usize]) {
        for (axis, &c) in coords.iter().enumerate() {
            self.min[axis] = self.min[axis].min(c);
            self.max[axis] = self.max[axis].max(c + 1);
        }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.min.len()
    }

    /// Inclusive lower corner
    #[inline]
    pub fn min(&self) -> &[usize] {
        &self.min
    }

    /// Exclusive upper corner
    #[inline]
    pub fn max(&self) -> &[usize] {
        &self.max
    }

    /// Side lengths
    pub fn shape(&self) -> Vec<usize> {
        self.min.iter().zip(&self.max).map(|(lo, hi)| hi - lo).collect()
    }

    /// Number of elements covered
    pub fn volume(&self) -> usize {
        self.min.iter().zip(&self.max).map(|(lo, hi)| hi - lo).product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    /// Geometric center in continuous coordinates
    pub fn center(&self) -> Vec<f64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(&lo, &hi)| (lo + hi) as f64 / 2.0 - 0.5)
            .collect()
    }

    /// Check if a continuous point lies inside the box (`min <= p < max`)
    ///
    /// A point with the wrong number of coordinates is never inside.
    pub fn contains_point(&self, point: &[f64]) -> bool {
        point.len() == self.ndim()
            && point
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(&p, (&lo, &hi))| p >= lo as f64 && p < hi as f64)
    }

    /// Check if integer coordinates lie inside the box
    pub fn contains_coords(&self, coords: &[usize]) -> bool {
        coords.len() == self.ndim()
            && coords
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(&c, (&lo, &hi))| c >= lo && c < hi)
    }

    /// Compute the intersection of two boxes
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if self.ndim() != other.ndim() {
            return None;
        }
        let min: Vec<usize> = self.min.iter().zip(&other.min).map(|(a, b)| *a.max(b)).collect();
        let max: Vec<usize> = self.max.iter().zip(&other.max).map(|(a, b)| *a.min(b)).collect();
        if min.iter().zip(&max).all(|(lo, hi)| lo < hi) {
            Some(BoundingBox { min, max })
        } else {
            None
        }
    }

    /// Compute the union (bounding box) of two boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.iter().zip(&other.min).map(|(a, b)| *a.min(b)).collect(),
            max: self.max.iter().zip(&other.max).map(|(a, b)| *a.max(b)).collect(),
        }
    }

    /// Intersection volume over union volume
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersect(other).map_or(0, |b| b.volume());
        let union = self.volume() + other.volume() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }

    /// Intersection volume over the smaller box's volume
    ///
    /// Equals `1.0` when one box lies entirely inside the other.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersect(other).map_or(0, |b| b.volume());
        let smaller = self.volume().min(other.volume());
        if smaller == 0 {
            0.0
        } else {
            inter as f64 / smaller as f64
        }
    }

    /// Expand the box by `margin` on every side, clipped to `shape`.
    pub fn pad(&self, margin: usize, shape: &[usize]) -> BoundingBox {
        BoundingBox {
            min: self.min.iter().map(|&lo| lo.saturating_sub(margin)).collect(),
            max: self
                .max
                .iter()
                .zip(shape)
                .map(|(&hi, &n)| (hi + margin).min(n))
                .collect(),
        }
    }

    /// Iterate over the linear indices of `grid` covered by this box, in
    /// row-major order.
    pub fn indices<'a>(&'a self, grid: &'a Grid) -> BoxIndices<'a> {
        BoxIndices {
            bbox: self,
            grid,
            cursor: self.min.clone(),
            done: self.is_empty() || self.ndim() != grid.ndim(),
        }
    }
}

/// Row-major iterator over the linear indices inside a [`BoundingBox`]
#[derive(Debug)]
pub struct BoxIndices<'a> {
    bbox: &'a BoundingBox,
    grid: &'a Grid,
    cursor: Vec<usize>,
    done: bool,
}

impl Iterator for BoxIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let index = self.grid.index(&self.cursor);
        let mut axis = self.cursor.len();
        loop {
            if axis == 0 {
                self.done = true;
                break;
            }
            axis -= 1;
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.bbox.max[axis] {
                break;
            }
            self.cursor[axis] = self.bbox.min[axis];
        }
        Some(index)
    }
}
