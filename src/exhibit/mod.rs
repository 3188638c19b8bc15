//! Matrix exhibit building blocks
//!
//! Structure:
//! - `container.rs`: read-only matrix containers (.mat, .npz, in-memory)
//! - `reader.rs`: flattening variables into 2D matrices
//! - `transform.rs`: clip / absolute value / normalization
//! - `spectral.rs`: singular values, norms, escape radius
//! - `record.rs`: exhibit record and its JSON encoding
//! - `logger.rs`: diagnostics sink
//! - `report.rs`: aggregate run status
//! - `error.rs`: error types

pub mod container;
pub mod error;
pub mod logger;
pub mod reader;
pub mod record;
pub mod report;
pub mod spectral;
pub mod transform;

// Re-exports for convenience
pub use container::{open_container, ContainerEntry, MatrixContainer, MemoryContainer};
pub use error::{ExhibitError, Result};
pub use logger::{Diagnostic, DiagnosticSink, MemorySink, Severity, TracingSink};
pub use reader::{read_matrices, Extraction, ReadOptions};
pub use record::{read_exhibit, write_exhibit, BoundingBox, ExhibitRecord};
pub use report::{RunReport, RunStatus};
pub use spectral::{EscapeRadius, NormKind};
pub use transform::{transform, TransformConfig};
