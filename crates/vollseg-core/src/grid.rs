//! N-dimensional raster geometry
//!
//! [`Grid`] maps between linear (row-major) indices and per-axis coordinates
//! and enumerates neighbors, so the algorithms can be written once for 1-D,
//! 2-D and 3-D arrays.

use crate::error::{Error, Result};
use ndarray::ArrayD;

/// Neighborhood used for connectivity, flooding and fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Neighbors differ along exactly one axis (4-way in 2-D, 6-way in 3-D)
    #[default]
    Face,
    /// Any combination of unit steps (8-way in 2-D, 26-way in 3-D)
    Full,
}

/// Shape and row-major strides of an N-d array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    shape: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl Grid {
    /// Create a grid for `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] for a zero-dimensional shape.
    pub fn new(shape: &[usize]) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::InvalidShape(Vec::new()));
        }
        let mut strides = vec![1usize; shape.len()];
        for axis in (0..shape.len() - 1).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }
        let len = shape.iter().product();
        Ok(Self {
            shape: shape.to_vec(),
            strides,
            len,
        })
    }

    /// Grid matching an array's shape
    pub fn of<T>(array: &ArrayD<T>) -> Result<Self> {
        Self::new(array.shape())
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear index of in-bounds coordinates
    #[inline]
    pub fn index(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.strides)
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Write the coordinates of `index` into `out` (length `ndim`).
    #[inline]
    pub fn coords_into(&self, mut index: usize, out: &mut [usize]) {
        for (axis, &stride) in self.strides.iter().enumerate() {
            out[axis] = index / stride;
            index %= stride;
        }
    }

    /// Coordinates of `index` as a new vector
    pub fn coords(&self, index: usize) -> Vec<usize> {
        let mut out = vec![0; self.ndim()];
        self.coords_into(index, &mut out);
        out
    }

    /// Whether signed coordinates fall inside the grid
    pub fn contains(&self, coords: &[isize]) -> bool {
        coords.len() == self.ndim()
            && coords
                .iter()
                .zip(&self.shape)
                .all(|(&c, &n)| c >= 0 && (c as usize) < n)
    }

    /// Precompute the neighbor steps for `connectivity`.
    pub fn neighborhood(&self, connectivity: Connectivity) -> Neighborhood {
        let deltas: Vec<Vec<isize>> = unit_steps(self.ndim())
            .into_iter()
            .filter(|d| match connectivity {
                Connectivity::Face => d.iter().filter(|&&v| v != 0).count() == 1,
                Connectivity::Full => true,
            })
            .collect();
        let linear = deltas
            .iter()
            .map(|d| {
                d.iter()
                    .zip(&self.strides)
                    .map(|(&v, &s)| v * s as isize)
                    .sum::<isize>()
            })
            .collect();
        Neighborhood { deltas, linear }
    }

    /// Collect the in-bounds neighbors of `index` into `out`.
    ///
    /// `scratch` is reused coordinate storage and must have length `ndim`.
    pub fn neighbors(
        &self,
        index: usize,
        hood: &Neighborhood,
        scratch: &mut [usize],
        out: &mut Vec<usize>,
    ) {
        out.clear();
        self.coords_into(index, scratch);
        'steps: for (delta, &step) in hood.deltas.iter().zip(&hood.linear) {
            for ((&c, &d), &n) in scratch.iter().zip(delta).zip(&self.shape) {
                let moved = c as isize + d;
                if moved < 0 || moved as usize >= n {
                    continue 'steps;
                }
            }
            out.push((index as isize + step) as usize);
        }
    }
}

/// Neighbor steps of a [`Grid`] for one [`Connectivity`]
#[derive(Debug, Clone)]
pub struct Neighborhood {
    deltas: Vec<Vec<isize>>,
    linear: Vec<isize>,
}

impl Neighborhood {
    /// Per-axis unit steps
    pub fn deltas(&self) -> &[Vec<isize>] {
        &self.deltas
    }

    /// Number of neighbors of an interior element
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Every vector in {-1, 0, 1}^ndim except the zero vector, in odometer order.
fn unit_steps(ndim: usize) -> Vec<Vec<isize>> {
    let mut steps = Vec::with_capacity(3usize.pow(ndim as u32));
    let mut current = vec![-1isize; ndim];
    loop {
        if current.iter().any(|&v| v != 0) {
            steps.push(current.clone());
        }
        let mut axis = ndim;
        loop {
            if axis == 0 {
                return steps;
            }
            axis -= 1;
            if current[axis] < 1 {
                current[axis] += 1;
                break;
            }
            current[axis] = -1;
        }
    }
}
