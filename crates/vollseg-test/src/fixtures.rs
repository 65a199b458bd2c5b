//! Synthetic label fields and masks
//!
//! Shapes used throughout the regression tests: Euclidean balls (disks in
//! 2-D), rings, axis-aligned boxes, and small fields drawn as text.

use crate::error::{TestError, TestResult};
use ndarray::{ArrayD, IxDyn};
use vollseg_core::{BoundingBox, Grid, LabelField, Mask};

fn squared_distance(coords: &[usize], center: &[f64]) -> f64 {
    coords
        .iter()
        .zip(center)
        .map(|(&c, &m)| (c as f64 - m).powi(2))
        .sum()
}

fn check_center(shape: &[usize], center: &[f64]) -> TestResult<Grid> {
    if shape.len() != center.len() {
        return Err(TestError::InvalidFixture(format!(
            "center {:?} does not match shape {:?}",
            center, shape
        )));
    }
    Ok(Grid::new(shape)?)
}

/// Mask of every element within `radius` of `center`
pub fn ball_mask(shape: &[usize], center: &[f64], radius: f64) -> TestResult<Mask> {
    let grid = check_center(shape, center)?;
    let r2 = radius * radius;
    Ok(ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        let coords: Vec<usize> = (0..grid.ndim()).map(|a| idx[a]).collect();
        squared_distance(&coords, center) <= r2
    }))
}

/// 2-D disk mask
pub fn disk_mask(shape: [usize; 2], center: [f64; 2], radius: f64) -> TestResult<Mask> {
    ball_mask(&shape, &center, radius)
}

/// Mask of every element whose distance to `center` lies in `[inner, outer]`
pub fn ring_mask(shape: &[usize], center: &[f64], inner: f64, outer: f64) -> TestResult<Mask> {
    if inner > outer {
        return Err(TestError::InvalidFixture(format!(
            "inner radius {} exceeds outer radius {}",
            inner, outer
        )));
    }
    let grid = check_center(shape, center)?;
    Ok(ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        let coords: Vec<usize> = (0..grid.ndim()).map(|a| idx[a]).collect();
        let d2 = squared_distance(&coords, center);
        d2 >= inner * inner && d2 <= outer * outer
    }))
}

/// Mask of the elements inside a half-open box
pub fn box_mask(shape: &[usize], bbox: &BoundingBox) -> TestResult<Mask> {
    let grid = Grid::new(shape)?;
    if bbox.ndim() != grid.ndim() {
        return Err(TestError::InvalidFixture(format!(
            "{}-d box in a {}-d array",
            bbox.ndim(),
            grid.ndim()
        )));
    }
    Ok(ArrayD::from_shape_fn(IxDyn(shape), |idx| {
        let coords: Vec<usize> = (0..grid.ndim()).map(|a| idx[a]).collect();
        bbox.contains_coords(&coords)
    }))
}

/// Write `id` into `field` wherever `mask` is set
pub fn paint(field: &mut LabelField, mask: &Mask, id: u32) -> TestResult<()> {
    vollseg_core::check_shape("mask", field.shape(), mask.shape())?;
    ndarray::Zip::from(field).and(mask).for_each(|f, &m| {
        if m {
            *f = id;
        }
    });
    Ok(())
}

/// Parse a 2-D label field drawn as text
///
/// `.` is background and the digits `1`-`9` are ids. Every row must have the
/// same width.
pub fn labels_from_rows(rows: &[&str]) -> TestResult<LabelField> {
    let width = rows.first().map_or(0, |r| r.len());
    let mut data = Vec::with_capacity(rows.len() * width);
    for row in rows {
        if row.len() != width {
            return Err(TestError::InvalidFixture(format!(
                "row '{}' is not {} wide",
                row, width
            )));
        }
        for ch in row.chars() {
            let id = match ch {
                '.' => 0,
                c => c.to_digit(10).ok_or_else(|| {
                    TestError::InvalidFixture(format!("unexpected character '{}'", c))
                })?,
            };
            data.push(id);
        }
    }
    Ok(vollseg_core::from_flat(&[rows.len(), width], data)?)
}

/// Parse a 2-D mask drawn as text; `#` is foreground, anything else background
pub fn mask_from_rows(rows: &[&str]) -> TestResult<Mask> {
    let width = rows.first().map_or(0, |r| r.len());
    if let Some(row) = rows.iter().find(|r| r.len() != width) {
        return Err(TestError::InvalidFixture(format!(
            "row '{}' is not {} wide",
            row, width
        )));
    }
    let data = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
    Ok(vollseg_core::from_flat(&[rows.len(), width], data)?)
}
