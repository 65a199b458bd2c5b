//! Region distinctness
//!
//! The reconstructor asks a [`DistinctnessOracle`] whether a region (given by
//! its bounding box) is distinct from a reference point, typically the
//! centroid of another detector's region. Distinct regions are treated as
//! objects the other detector missed.

use vollseg_core::BoundingBox;

/// Judges whether a region is distinct from a reference point
pub trait DistinctnessOracle {
    /// `true` if the region in `region_box` does not account for `point`
    fn is_distinct(&self, region_box: &BoundingBox, point: &[f64]) -> bool;

    /// `true` if the region is distinct from every point in `points`
    ///
    /// Vacuously true for an empty point set.
    fn is_distinct_from_all(&self, region_box: &BoundingBox, points: &[Vec<f64>]) -> bool {
        points.iter().all(|p| self.is_distinct(region_box, p))
    }
}

/// A region is distinct from a point that lies outside its box
///
/// Containment uses the half-open box convention, `min <= p < max` on every
/// axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxContainmentOracle;

impl DistinctnessOracle for BoxContainmentOracle {
    fn is_distinct(&self, region_box: &BoundingBox, point: &[f64]) -> bool {
        !region_box.contains_point(point)
    }
}

impl<F> DistinctnessOracle for F
where
    F: Fn(&BoundingBox, &[f64]) -> bool,
{
    fn is_distinct(&self, region_box: &BoundingBox, point: &[f64]) -> bool {
        self(region_box, point)
    }
}
