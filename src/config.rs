//! Run configuration for the exhibit generator and the connectivity checker
//!
//! Configuration can be loaded from a JSON file (every field optional) and is
//! then overridden by command-line flags. Nothing is read or written before
//! `validate()` has accepted the final configuration.

use crate::exhibit::error::{ExhibitError, Result};
use crate::exhibit::record::BoundingBox;
use crate::exhibit::transform::TransformConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Lower clip bound used by the connectivity checker when none is given
pub const DEFAULT_CONNECTIVITY_CLIP: (f64, f64) = (0.0, f64::INFINITY);

/// Exhibit generation settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExhibitConfig {
    /// Variables to read from the container, in order
    pub variables: Vec<String>,

    /// Base name for output files (`{stem}-{index}.{ext}`).
    /// Defaults to the input file with a `.json` extension.
    pub output: Option<PathBuf>,

    /// Transformations applied to each matrix
    pub transform: TransformConfig,

    /// Rendering viewport written into every exhibit
    pub bounding_box: BoundingBox,

    /// Ceiling for the emitted escape radius
    pub max_escape_radius: Option<f64>,

    /// Also write the mean of all transformed matrices
    pub include_average: bool,

    /// Replace existing output files
    pub overwrite: bool,
}

impl Default for ExhibitConfig {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            output: None,
            transform: TransformConfig::default(),
            bounding_box: BoundingBox::default(),
            max_escape_radius: None,
            include_average: false,
            overwrite: false,
        }
    }
}

impl ExhibitConfig {
    /// Load from a JSON document
    ///
    /// An unknown normalization mode is rejected here, before any run starts.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ExhibitError::InvalidConfig(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ExhibitError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject configurations that must not start a run
    pub fn validate(&self) -> Result<()> {
        self.bounding_box.validate()?;

        if let Some(radius) = self.max_escape_radius {
            if !(radius > 0.0) {
                return Err(ExhibitError::NonPositiveEscapeRadius(radius));
            }
        }

        Ok(())
    }

    /// Output base name for a given input file
    pub fn output_base(&self, input: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| input.with_extension("json"))
    }
}

/// Connectivity checker settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectivityConfig {
    /// Variables to read from the container, in order
    pub variables: Vec<String>,

    /// Clip range for the second graph; `[0, +inf)` when unset
    pub clip: Option<(f64, f64)>,
}

impl ConnectivityConfig {
    pub fn effective_clip(&self) -> (f64, f64) {
        self.clip.unwrap_or(DEFAULT_CONNECTIVITY_CLIP)
    }
}
