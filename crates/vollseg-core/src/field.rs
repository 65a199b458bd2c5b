//! Array aliases shared by every stage of the engine
//!
//! Label fields, masks and cost fields are plain `ndarray` dynamic-dimension
//! arrays. The helpers here move between the logical (row-major) element
//! order of an arbitrary view and the flat buffers the algorithms work on.

use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};

/// Instance labels; `0` is background, every positive value is an instance id
pub type LabelField = ArrayD<u32>;

/// Admissible foreground
pub type Mask = ArrayD<bool>;

/// Flooding elevation source; higher means more interior
pub type CostField = ArrayD<f32>;

/// Fail with [`Error::ShapeMismatch`] unless `actual == expected`.
pub fn check_shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(Error::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// Copy an array into a flat buffer in logical row-major order.
///
/// Works for any memory layout, including transposed or sliced views.
pub fn to_flat<T: Copy>(array: &ArrayD<T>) -> Vec<T> {
    array.iter().copied().collect()
}

/// Build an array of `shape` from a flat row-major buffer.
pub fn from_flat<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?)
}

/// Largest id present in a label field (`0` for an all-background field)
pub fn max_label(field: &LabelField) -> u32 {
    field.iter().copied().max().unwrap_or(0)
}

/// Foreground mask of a label field
pub fn foreground(field: &LabelField) -> Mask {
    field.mapv(|v| v != 0)
}
