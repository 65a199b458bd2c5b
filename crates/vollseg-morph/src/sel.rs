//! Structuring Element (SEL) for morphological operations
//!
//! A structuring element defines the neighborhood used in morphological
//! operations. Here it is a set of signed offsets from the origin, so the same
//! type serves 1-D, 2-D and 3-D arrays.

use crate::{MorphError, MorphResult};
use vollseg_core::Grid;

/// Structuring Element (SEL)
///
/// Stores the hit offsets relative to the origin. The origin itself is an
/// offset like any other and is normally included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sel {
    ndim: usize,
    offsets: Vec<Vec<isize>>,
    name: Option<String>,
}

impl Sel {
    /// Create a structuring element from explicit offsets
    ///
    /// # Errors
    ///
    /// Returns an error if `ndim` is zero, no offsets are given, or an offset
    /// has the wrong number of coordinates.
    pub fn from_offsets(ndim: usize, offsets: Vec<Vec<isize>>) -> MorphResult<Self> {
        if ndim == 0 {
            return Err(MorphError::InvalidSel("zero-dimensional sel".to_string()));
        }
        if offsets.is_empty() {
            return Err(MorphError::InvalidSel("sel has no hits".to_string()));
        }
        if let Some(bad) = offsets.iter().find(|o| o.len() != ndim) {
            return Err(MorphError::InvalidSel(format!(
                "offset {:?} does not have {} coordinates",
                bad, ndim
            )));
        }
        Ok(Self {
            ndim,
            offsets,
            name: None,
        })
    }

    /// Create a Euclidean ball: every offset `o` with `|o|^2 <= radius^2`
    ///
    /// A disk in 2-D, a ball in 3-D, a segment of length `2 * radius + 1` in 1-D.
    pub fn create_ball(radius: usize, ndim: usize) -> MorphResult<Self> {
        if ndim == 0 {
            return Err(MorphError::InvalidSel("zero-dimensional sel".to_string()));
        }
        let r = radius as isize;
        let side = 2 * radius + 1;
        let grid = Grid::new(&vec![side; ndim])?;
        let mut offsets = Vec::new();
        for index in 0..grid.len() {
            let offset: Vec<isize> = grid.coords(index).iter().map(|&c| c as isize - r).collect();
            if offset.iter().map(|v| v * v).sum::<isize>() <= r * r {
                offsets.push(offset);
            }
        }
        let mut sel = Self::from_offsets(ndim, offsets)?;
        sel.set_name(format!("ball{}d_r{}", ndim, radius));
        Ok(sel)
    }

    /// Create a disk (2-D ball)
    pub fn create_disk(radius: usize) -> MorphResult<Self> {
        Self::create_ball(radius, 2)
    }

    /// Create a cross: the origin plus its face neighbors
    pub fn create_cross(ndim: usize) -> MorphResult<Self> {
        Self::create_ball(1, ndim)
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Get the name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Hit positions relative to the origin
    pub fn hit_offsets(&self) -> &[Vec<isize>] {
        &self.offsets
    }

    /// Count the number of hit elements
    pub fn hit_count(&self) -> usize {
        self.offsets.len()
    }

    /// Create the reflected (point-mirrored) SEL
    pub fn reflect(&self) -> Self {
        Self {
            ndim: self.ndim,
            offsets: self
                .offsets
                .iter()
                .map(|o| o.iter().map(|v| -v).collect())
                .collect(),
            name: self.name.clone(),
        }
    }
}
