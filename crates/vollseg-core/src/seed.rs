//! Watershed seeds
//!
//! A [`Seed`] is a continuous point tagged with where it came from. Seeds are
//! turned into marker ids in arrival order by the reconstructor.

use crate::error::{Error, Result};

/// Origin of a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedSource {
    /// Centroid of a region in a raw instance-label field
    Instance,
    /// Centroid of a mask component no instance seed accounts for
    Mask,
    /// The always-present background marker at the origin
    Sentinel,
}

/// A seed point with one coordinate per axis
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub point: Vec<f64>,
    pub source: SeedSource,
}

impl Seed {
    pub fn new(point: Vec<f64>, source: SeedSource) -> Self {
        Self { point, source }
    }

    /// Sentinel seed at the origin of an `ndim`-dimensional array
    pub fn sentinel(ndim: usize) -> Self {
        Self {
            point: vec![0.0; ndim],
            source: SeedSource::Sentinel,
        }
    }

    /// Round the point to integer coordinates clamped into `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensionality does not match `shape` or the
    /// shape has an empty axis.
    pub fn rounded(&self, shape: &[usize]) -> Result<Vec<usize>> {
        if self.point.len() != shape.len() {
            return Err(Error::DimensionMismatch {
                expected: shape.len(),
                actual: self.point.len(),
            });
        }
        if shape.contains(&0) {
            return Err(Error::InvalidShape(shape.to_vec()));
        }
        Ok(self
            .point
            .iter()
            .zip(shape)
            .map(|(&p, &n)| {
                // NaN rounds to 0 through the saturating cast
                let r = p.round().max(0.0) as usize;
                r.min(n - 1)
            })
            .collect())
    }
}
