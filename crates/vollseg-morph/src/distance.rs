//! Exact Euclidean distance and feature transforms
//!
//! Separable lower-envelope algorithm (Felzenszwalb & Huttenlocher): one pass
//! per axis, each pass computing the lower envelope of parabolas rooted at the
//! finite samples of a 1-D line. Alongside the squared distance, each pass
//! carries the linear index of the nearest site, which yields the feature
//! transform.
//!
//! On each 1-D pass an exact tie between two parabolas resolves to the one
//! rooted at the lower position along that axis.

use crate::MorphResult;
use ndarray::ArrayD;
use vollseg_core::{Grid, Mask, from_flat, to_flat};

const NO_SITE: usize = usize::MAX;

/// Squared distance and nearest site for every element of an array
#[derive(Debug, Clone)]
pub struct FeatureTransform {
    grid: Grid,
    sq_dist: Vec<f64>,
    nearest: Vec<usize>,
}

impl FeatureTransform {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Squared Euclidean distance from element `index` to its nearest site
    ///
    /// Infinite when the input has no sites.
    #[inline]
    pub fn squared_distance(&self, index: usize) -> f64 {
        self.sq_dist[index]
    }

    /// Euclidean distance from element `index` to its nearest site
    #[inline]
    pub fn distance(&self, index: usize) -> f64 {
        self.sq_dist[index].sqrt()
    }

    /// Linear index of the nearest site, `None` when there are no sites
    #[inline]
    pub fn nearest(&self, index: usize) -> Option<usize> {
        match self.nearest[index] {
            NO_SITE => None,
            site => Some(site),
        }
    }

    /// Distance map shaped like the input
    pub fn distances(&self) -> MorphResult<ArrayD<f64>> {
        let data = self.sq_dist.iter().map(|d| d.sqrt()).collect();
        Ok(from_flat(self.grid.shape(), data)?)
    }
}

/// Compute the feature transform of `sites`
///
/// Every element receives the squared distance to, and the linear index of,
/// the nearest `true` element of `sites`.
pub fn feature_transform(sites: &Mask) -> MorphResult<FeatureTransform> {
    let grid = Grid::of(sites)?;
    let flat = to_flat(sites);

    let mut sq_dist: Vec<f64> = flat
        .iter()
        .map(|&s| if s { 0.0 } else { f64::INFINITY })
        .collect();
    let mut nearest: Vec<usize> = flat
        .iter()
        .enumerate()
        .map(|(i, &s)| if s { i } else { NO_SITE })
        .collect();

    let mut envelope = Envelope::default();
    for axis in 0..grid.ndim() {
        let stride = grid.strides()[axis];
        let n = grid.shape()[axis];
        if n == 0 {
            continue;
        }
        let mut line_f = vec![0.0f64; n];
        let mut line_site = vec![NO_SITE; n];

        for base in 0..grid.len() {
            if (base / stride) % n != 0 {
                continue;
            }
            for q in 0..n {
                line_f[q] = sq_dist[base + q * stride];
                line_site[q] = nearest[base + q * stride];
            }
            if !envelope.build(&line_f) {
                continue;
            }
            envelope.query(&line_f, |q, f, from| {
                sq_dist[base + q * stride] = f;
                nearest[base + q * stride] = line_site[from];
            });
        }
    }

    Ok(FeatureTransform {
        grid,
        sq_dist,
        nearest,
    })
}

/// Euclidean distance from every `true` element to the nearest `false` one
///
/// Background elements have distance 0. When `input` has no `false` element
/// every distance is infinite.
pub fn distance_transform_edt(input: &Mask) -> MorphResult<ArrayD<f64>> {
    feature_transform(&input.mapv(|v| !v))?.distances()
}

/// Lower envelope of the parabolas `(x - v)^2 + f[v]` over one line
#[derive(Debug, Default)]
struct Envelope {
    roots: Vec<usize>,
    bounds: Vec<f64>,
}

impl Envelope {
    /// Build the envelope over the finite samples of `f`; `false` if there are none.
    fn build(&mut self, f: &[f64]) -> bool {
        self.roots.clear();
        self.bounds.clear();

        for (q, &fq) in f.iter().enumerate() {
            if !fq.is_finite() {
                continue;
            }
            if self.roots.is_empty() {
                self.roots.push(q);
                self.bounds.push(f64::NEG_INFINITY);
                continue;
            }
            let s = loop {
                let k = self.roots.len() - 1;
                let v = self.roots[k];
                let qf = q as f64;
                let vf = v as f64;
                let s = ((fq + qf * qf) - (f[v] + vf * vf)) / (2.0 * (qf - vf));
                if s <= self.bounds[k] && k > 0 {
                    self.roots.pop();
                    self.bounds.pop();
                } else {
                    break s;
                }
            };
            self.roots.push(q);
            self.bounds.push(s);
        }
        !self.roots.is_empty()
    }

    /// Visit every position with its envelope value and the root it came from.
    fn query(&self, f: &[f64], mut visit: impl FnMut(usize, f64, usize)) {
        let mut k = 0;
        for q in 0..f.len() {
            let qf = q as f64;
            while k + 1 < self.roots.len() && self.bounds[k + 1] < qf {
                k += 1;
            }
            let v = self.roots[k];
            let d = qf - v as f64;
            visit(q, d * d + f[v], v);
        }
    }
}
