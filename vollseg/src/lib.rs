//! vollseg - Instance label reconstruction for Rust
//!
//! Turns the raw outputs of segmentation detectors (a foreground mask, a
//! per-pixel cost or probability field, instance labels) into a consistent
//! N-d instance label field, and keeps instance ids stable across slices and
//! frames.
//!
//! # Overview
//!
//! - Label expansion and per-instance hole filling
//! - Marker-constrained watershed reconstruction with pluggable distinctness
//!   and duplicate-suppression strategies
//! - IoU and centroid based label matching along sequences
//! - A segmentation pipeline over optional detector outputs
//!
//! # Example
//!
//! ```
//! use vollseg::{DetectorOutput, SegmentationOptions, segment_default};
//! use vollseg::{LabelField, Mask};
//! use vollseg::ndarray::IxDyn;
//!
//! let mut mask = Mask::from_elem(IxDyn(&[8, 8]), false);
//! mask[[2, 2]] = true;
//! mask[[2, 3]] = true;
//! mask[[6, 6]] = true;
//!
//! let output = DetectorOutput::new().with_mask(mask);
//! let seg = segment_default(&output, &SegmentationOptions::default()).unwrap();
//! assert_eq!(seg.labels[[2, 2]], seg.labels[[2, 3]]);
//! assert_ne!(seg.labels[[2, 2]], seg.labels[[6, 6]]);
//! ```

pub mod pipeline;

// Re-export core types (primary data structures used everywhere)
pub use vollseg_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use vollseg_morph as morph;
pub use vollseg_region as region;

pub use vollseg_region::{
    BoxContainmentOracle, BoxOverlapSuppressor, DistinctnessOracle, MatchOptions, NoSuppression,
    ReconstructOptions, Reconstructor, RegionError, RegionResult, RegionSuppressor,
    expand_labels, fill_label_holes, match_sequence, reconstruct,
};

pub use pipeline::{
    DEFAULT_COST_FLOOR, DetectorOutput, Segmentation, SegmentationOptions, segment,
    segment_default, segment_sequence,
};
