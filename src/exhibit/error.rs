use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting, transforming or writing exhibits
///
/// The variants fall into three groups: fatal configuration errors (reported
/// before any matrix is read), per-variable extraction errors and per-write
/// errors. Only the first group aborts a run; the others are collected in a
/// [`RunReport`](super::report::RunReport).
#[derive(Debug, Error)]
pub enum ExhibitError {
    /// Bounding box with `upper_left` not above and to the left of `lower_right`
    #[error("Invalid bounds: {axis}min {min} {axis}max {max}")]
    InvalidBounds { axis: char, min: f64, max: f64 },

    /// Escape radius ceiling that is not strictly positive
    #[error("Non-positive maximum escape radius: {0}")]
    NonPositiveEscapeRadius(f64),

    /// Normalization mode outside of the supported set
    #[error("Unknown norm type: '{0}' (expected one of 1, 2, inf, fro, nuc, max)")]
    UnknownNorm(String),

    /// Configuration error (malformed config file, empty variable list, etc.)
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// The input container could not be opened or parsed
    #[error("Failed to load '{path}': {message}")]
    Container { path: PathBuf, message: String },

    /// Requested variable is not present in the container
    #[error("Object '{name}' not found in '{source_name}'")]
    MissingVariable { name: String, source_name: String },

    /// Variable exists but is not a dense real numeric array
    #[error("Object '{name}' is not a dense real array: '{kind}'")]
    UnsupportedElementType { name: String, kind: String },

    /// Variable has a rank the reader does not handle
    #[error("Object '{name}' has unsupported shape: {shape:?}")]
    UnsupportedShape { name: String, shape: Vec<usize> },

    /// Matrix that must be square (adjacency matrix) is not
    #[error("Matrix {index} is not square: {rows}x{cols}")]
    NonSquare {
        index: usize,
        rows: usize,
        cols: usize,
    },

    /// Matrices with different shapes cannot be averaged
    #[error("Cannot average matrices of shapes {expected:?} and {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Output target exists and overwriting was not requested
    #[error("Output file exists (use --overwrite): '{}'", .0.display())]
    OutputExists(PathBuf),

    /// I/O error while writing an exhibit
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExhibitError {
    /// Whether this error aborts the whole run rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidBounds { .. }
                | Self::NonPositiveEscapeRadius(_)
                | Self::UnknownNorm(_)
                | Self::InvalidConfig(_)
                | Self::Container { .. }
        )
    }
}

/// Type alias for Results using ExhibitError
pub type Result<T> = std::result::Result<T, ExhibitError>;
