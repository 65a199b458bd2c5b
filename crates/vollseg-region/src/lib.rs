//! vollseg-region - Label reconstruction and repair
//!
//! This crate provides the region-level operations of the engine:
//!
//! - **Connected components** - Labeling masks and splitting label fields
//! - **Expansion and hole filling** - Growing labels by distance, closing holes
//! - **Watershed** - Priority-flood segmentation from markers
//! - **Reconstruction** - Fusing instance labels with a mask and a cost field
//! - **Matching** - Stable instance ids along slices and frames
//!
//! # Examples
//!
//! ## Expanding labels
//!
//! ```
//! use vollseg_region::expand_labels;
//! use ndarray::array;
//!
//! let field = array![0u32, 1, 0, 0, 0, 0, 2].into_dyn();
//! let grown = expand_labels(&field, 1.0).unwrap();
//! assert_eq!(grown, array![1u32, 1, 1, 0, 0, 2, 2].into_dyn());
//! ```
//!
//! ## Reconstructing from a detector
//!
//! ```
//! use vollseg_region::{ReconstructOptions, Reconstructor};
//! use vollseg_core::{CostField, LabelField, Mask};
//! use ndarray::IxDyn;
//!
//! let mask = Mask::from_elem(IxDyn(&[5, 5]), true);
//! let cost = CostField::from_elem(IxDyn(&[5, 5]), 1.0);
//! let mut instances = LabelField::zeros(IxDyn(&[5, 5]));
//! instances[[2, 2]] = 7;
//!
//! let reconstructor = Reconstructor::new(ReconstructOptions::default());
//! let labels = reconstructor.reconstruct(&mask, &cost, &instances).unwrap();
//! assert!(labels.iter().all(|&v| v != 0));
//! ```

mod assign;
pub mod conncomp;
mod error;
pub mod expand;
pub mod holes;
pub mod matching;
pub mod oracle;
pub mod reconstruct;
pub mod relabel;
pub mod suppress;
pub mod watershed;

// Re-export core types
pub use vollseg_core;

pub use error::{RegionError, RegionResult};

pub use conncomp::{count_components, label_components, relabel_components};
pub use expand::expand_labels;
pub use holes::fill_label_holes;
pub use matching::{
    DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_CENTROID_DISTANCE, LabelReservoir, MatchOptions,
    SequentialLabelMatcher, match_centroids, match_pair, match_sequence, match_volume,
    merge_labels_across_volume,
};
pub use oracle::{BoxContainmentOracle, DistinctnessOracle};
pub use reconstruct::{
    DEFAULT_OVERLAP_THRESHOLD, DEFAULT_Z_WINDOW, MARKER_RADIUS, ReconstructOptions,
    Reconstruction, Reconstructor, reconstruct,
};
pub use relabel::{relabel_sequential, remove_big_objects, remove_small_objects};
pub use suppress::{BoxOverlapSuppressor, NoSuppression, RegionSuppressor};
pub use watershed::{WatershedOptions, watershed_from_markers, watershed_from_maxima};

// Per-label erosion lives with the other morphology
pub use vollseg_morph::erode_labels;
