//! Elementwise and normalization transforms applied to each exhibit matrix
//!
//! The order is fixed: clip, absolute value, normalize. Transposition happens
//! earlier, when matrices are read from the container.

use super::spectral::NormKind;
use ndarray::Array2;
use serde::Deserialize;

/// Transformations applied to every extracted matrix
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Clamp entries into `[min, max]`
    pub clip: Option<(f64, f64)>,

    /// Replace entries by their magnitude
    pub absolute: bool,

    /// Divide by the chosen matrix norm
    pub normalize: Option<NormKind>,

    /// Transpose 2D variables (or slice 3D variables along their last axis)
    pub transpose: bool,
}

/// Clamp `value` into `[min, max]`, keeping NaN as NaN
///
/// The upper bound wins when `min > max`, so every entry becomes `max`.
#[inline]
pub fn clip_value(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.max(min).min(max)
    }
}

/// Clamp every entry of `mat` into `[min, max]`
pub fn clip(mat: &Array2<f64>, min: f64, max: f64) -> Array2<f64> {
    mat.mapv(|v| clip_value(v, min, max))
}

/// Apply `config` to `mat`, returning a new matrix of the same shape
///
/// Normalizing a zero matrix divides by zero; the resulting non-finite
/// entries are returned as-is.
pub fn transform(mat: &Array2<f64>, config: &TransformConfig) -> Array2<f64> {
    let mut result = match config.clip {
        Some((min, max)) => clip(mat, min, max),
        None => mat.to_owned(),
    };

    if config.absolute {
        result.mapv_inplace(f64::abs);
    }

    if let Some(kind) = config.normalize {
        let norm = kind.evaluate(&result);
        result.mapv_inplace(|v| v / norm);
    }

    result
}
