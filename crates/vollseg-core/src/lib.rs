//! vollseg Core - Basic data structures for label reconstruction
//!
//! This crate provides the fundamental data structures used throughout
//! the vollseg engine:
//!
//! - [`LabelField`] / [`Mask`] / [`CostField`] - N-d label, mask and cost arrays
//! - [`Grid`] / [`Connectivity`] - Index arithmetic and neighborhoods
//! - [`BoundingBox`] - Half-open N-d region extents
//! - [`Seed`] - Tagged watershed seed points
//! - [`RegionProps`] - Area, bounding box and centroid per region
//!
//! # Example
//!
//! ```
//! use vollseg_core::{LabelField, region_props};
//! use ndarray::IxDyn;
//!
//! let mut field = LabelField::zeros(IxDyn(&[4, 4]));
//! field[[1, 1]] = 3;
//! field[[1, 2]] = 3;
//!
//! let props = region_props(&field).unwrap();
//! assert_eq!(props.len(), 1);
//! assert_eq!(props[0].area, 2);
//! ```

pub mod bbox;
pub mod error;
pub mod field;
pub mod grid;
pub mod region;
pub mod seed;

pub use bbox::{BoundingBox, BoxIndices};
pub use error::{Error, Result};
pub use field::{
    CostField, LabelField, Mask, check_shape, foreground, from_flat, max_label, to_flat,
};
pub use grid::{Connectivity, Grid, Neighborhood};
pub use region::{RegionProps, label_areas, region_props, unique_labels};
pub use seed::{Seed, SeedSource};

// Re-export the array crate so downstream users agree on its version
pub use ndarray;
