//! vollseg-morph - Morphology and distance transforms for N-d arrays
//!
//! This crate provides the morphological building blocks of the engine:
//!
//! - Structuring elements (SEL) as signed offset sets for any dimension
//! - Binary morphology: erosion, dilation, hole filling
//! - Label morphology: grey (max) dilation of markers, per-label erosion
//! - Exact Euclidean distance and feature (nearest-site) transforms

pub mod binary;
pub mod distance;
mod error;
pub mod label;
pub mod sel;

pub use error::{MorphError, MorphResult};
pub use sel::Sel;

pub use binary::{dilate, erode, erode_iterated, fill_holes};
pub use distance::{FeatureTransform, distance_transform_edt, feature_transform};
pub use label::{dilate_labels, erode_labels};
