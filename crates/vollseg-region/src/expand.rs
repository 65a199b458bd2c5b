//! Distance-limited label expansion
//!
//! Grows labeled regions into the background without letting regions
//! overwrite or merge into each other.

use crate::error::{RegionError, RegionResult};
use tracing::trace;
use vollseg_core::{LabelField, foreground, from_flat, to_flat};
use vollseg_morph::feature_transform;

/// Expand labels by up to `distance` pixels
///
/// Every background pixel whose Euclidean distance to the nearest labeled
/// pixel is at most `distance` takes that pixel's id. Existing labels are
/// never changed. Where a background pixel is equidistant from two regions,
/// the winner is the site the distance transform settles on, which is the
/// lower-indexed one along the last axis where the tie occurs.
///
/// # Arguments
///
/// * `field` - Input label field
/// * `distance` - Maximum growth distance; may be infinite
///
/// # Errors
///
/// Returns [`RegionError::InvalidParameters`] if `distance` is negative or NaN.
pub fn expand_labels(field: &LabelField, distance: f64) -> RegionResult<LabelField> {
    if distance.is_nan() || distance < 0.0 {
        return Err(RegionError::InvalidParameters(format!(
            "expansion distance must be non-negative, got {}",
            distance
        )));
    }

    let ft = feature_transform(&foreground(field))?;
    let src = to_flat(field);
    let mut dst = src.clone();
    let mut grown = 0usize;

    for (index, out) in dst.iter_mut().enumerate() {
        if *out != 0 || ft.distance(index) > distance {
            continue;
        }
        if let Some(site) = ft.nearest(index) {
            *out = src[site];
            grown += 1;
        }
    }
    trace!(grown, distance, "expanded labels");

    Ok(from_flat(field.shape(), dst)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{IxDyn, array};

    #[test]
    fn test_expand_1d() {
        let field = array![0u32, 1, 0, 0, 0, 0, 2].into_dyn();
        assert_eq!(
            expand_labels(&field, 1.0).unwrap(),
            array![1u32, 1, 1, 0, 0, 2, 2].into_dyn()
        );
        assert_eq!(
            expand_labels(&field, 3.0).unwrap(),
            array![1u32, 1, 1, 1, 2, 2, 2].into_dyn()
        );
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let field = array![[0u32, 3], [0, 0]].into_dyn();
        assert_eq!(expand_labels(&field, 0.0).unwrap(), field);
    }

    #[test]
    fn test_invalid_distance() {
        let field = array![0u32, 1].into_dyn();
        assert!(expand_labels(&field, -1.0).is_err());
        assert!(expand_labels(&field, f64::NAN).is_err());
    }

    #[test]
    fn test_empty_field_stays_empty() {
        let field = LabelField::zeros(IxDyn(&[3, 4]));
        assert_eq!(expand_labels(&field, f64::INFINITY).unwrap(), field);
    }

    #[test]
    fn test_diagonal_uses_euclidean_distance() {
        let mut field = LabelField::zeros(IxDyn(&[3, 3]));
        field[[1, 1]] = 4;
        let out = expand_labels(&field, 1.0).unwrap();
        assert_eq!(out.iter().filter(|&&v| v == 4).count(), 5);
        let out = expand_labels(&field, 1.5).unwrap();
        assert_eq!(out.iter().filter(|&&v| v == 4).count(), 9);
    }
}
