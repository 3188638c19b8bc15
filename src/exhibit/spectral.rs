//! Singular values, matrix norms and the escape radius estimate
//!
//! The SVD is delegated to nalgebra; matrices are kept as ndarray `Array2`
//! everywhere else and only converted here.

use nalgebra::DMatrix;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ExhibitError;

/// Iteration cap for the SVD, so non-finite input cannot spin forever
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Singular values of `mat`, in descending order
///
/// Matrices with non-finite entries (or an SVD that fails to converge) yield a
/// spectrum of NaN, which then propagates into norms and escape radii.
pub fn singular_values(mat: &Array2<f64>) -> Vec<f64> {
    let (rows, cols) = mat.dim();
    let k = rows.min(cols);
    if k == 0 {
        return Vec::new();
    }

    if mat.iter().any(|v| !v.is_finite()) {
        return vec![f64::NAN; k];
    }

    let dense = DMatrix::from_fn(rows, cols, |i, j| mat[[i, j]]);
    match dense.try_svd(false, false, f64::EPSILON, SVD_MAX_ITERATIONS) {
        Some(svd) => {
            let mut sigma: Vec<f64> = svd.singular_values.iter().copied().collect();
            sigma.sort_by(|a, b| b.total_cmp(a));
            sigma
        }
        None => vec![f64::NAN; k],
    }
}

/// 2-norm condition number `max(sigma) / min(sigma)`
pub fn condition_number(sigma: &[f64]) -> f64 {
    match (sigma.first(), sigma.last()) {
        (Some(&max), Some(&min)) => max / min,
        _ => f64::NAN,
    }
}

/// Matrix norm used to normalize exhibits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NormKind {
    /// Maximum absolute column sum
    One,
    /// Largest singular value
    Two,
    /// Maximum absolute row sum
    Inf,
    /// Square root of the sum of squared entries
    Frobenius,
    /// Sum of singular values
    Nuclear,
    /// Largest absolute entry
    Max,
}

impl NormKind {
    pub const ALL: [NormKind; 6] = [
        NormKind::One,
        NormKind::Two,
        NormKind::Inf,
        NormKind::Frobenius,
        NormKind::Nuclear,
        NormKind::Max,
    ];

    /// Name used on the command line and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            NormKind::One => "1",
            NormKind::Two => "2",
            NormKind::Inf => "inf",
            NormKind::Frobenius => "fro",
            NormKind::Nuclear => "nuc",
            NormKind::Max => "max",
        }
    }

    /// Evaluate the norm of `mat`
    pub fn evaluate(&self, mat: &Array2<f64>) -> f64 {
        match self {
            NormKind::One => max_abs_sum(mat, Axis(0)),
            NormKind::Inf => max_abs_sum(mat, Axis(1)),
            NormKind::Two => singular_values(mat).first().copied().unwrap_or(0.0),
            NormKind::Nuclear => singular_values(mat).iter().sum(),
            NormKind::Frobenius => mat.iter().map(|v| v * v).sum::<f64>().sqrt(),
            NormKind::Max => mat.iter().fold(0.0, |acc: f64, v| {
                let a = v.abs();
                if a.is_nan() || acc.is_nan() {
                    f64::NAN
                } else {
                    acc.max(a)
                }
            }),
        }
    }
}

/// Largest absolute sum along `axis` (Axis(0) sums columns, Axis(1) rows)
fn max_abs_sum(mat: &Array2<f64>, axis: Axis) -> f64 {
    mat.map(|v| v.abs())
        .sum_axis(axis)
        .iter()
        .fold(0.0, |acc: f64, &s| if s.is_nan() { f64::NAN } else { acc.max(s) })
}

impl FromStr for NormKind {
    type Err = ExhibitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NormKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ExhibitError::UnknownNorm(s.to_string()))
    }
}

impl TryFrom<String> for NormKind {
    type Error = ExhibitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NormKind> for String {
    fn from(kind: NormKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escape radius of an exhibit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeRadius {
    /// Uncapped estimate `2 sqrt(n) / min(sigma)^2`
    pub estimated: f64,
    /// Value written to the exhibit (estimate limited by the ceiling)
    pub emitted: f64,
}

impl EscapeRadius {
    /// Estimate from the singular value spectrum of `mat`
    ///
    /// A singular matrix gives an infinite estimate. When `ceiling` is set and
    /// the estimate exceeds it, the ceiling is emitted instead. NaN estimates
    /// are emitted unchanged.
    pub fn estimate(mat: &Array2<f64>, ceiling: Option<f64>) -> Self {
        let sigma = singular_values(mat);
        Self::from_singular_values(mat.nrows(), &sigma, ceiling)
    }

    /// Same as [`EscapeRadius::estimate`] with a precomputed spectrum
    pub fn from_singular_values(n: usize, sigma: &[f64], ceiling: Option<f64>) -> Self {
        let sigma_min = sigma
            .iter()
            .copied()
            .fold(f64::INFINITY, |acc, s| if s.is_nan() { f64::NAN } else { acc.min(s) });
        let estimated = 2.0 * (n as f64).sqrt() / (sigma_min * sigma_min);

        let emitted = match ceiling {
            Some(max) if estimated > max => max,
            _ => estimated,
        };

        Self { estimated, emitted }
    }
}
