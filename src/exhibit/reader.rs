//! Matrix extraction from a container
//!
//! Flattens the requested variables into one ordered list of 2D matrices.
//! A variable that cannot be read is logged and skipped, the remaining ones
//! are still processed.

use super::container::MatrixContainer;
use super::error::ExhibitError;
use super::logger::DiagnosticSink;
use ndarray::{Array2, ArrayD, Axis, Ix2, Ix3};

/// How variables are turned into matrices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Transpose 2D variables; slice 3D variables along their last axis
    /// instead of their first
    pub transpose: bool,

    /// Only accept 3D variables, always sliced along the last axis
    pub stacked_only: bool,
}

impl ReadOptions {
    /// Options used by the exhibit generator
    pub fn exhibits(transpose: bool) -> Self {
        Self {
            transpose,
            stacked_only: false,
        }
    }

    /// Options used by the connectivity checker
    pub fn stacked() -> Self {
        Self {
            transpose: true,
            stacked_only: true,
        }
    }
}

/// Matrices read from a container plus the per-variable failures
#[derive(Debug, Default)]
pub struct Extraction {
    pub matrices: Vec<Array2<f64>>,
    pub failures: Vec<ExhibitError>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

/// Read every variable in `names`, in order
///
/// If nothing could be read a warning is emitted; the caller decides whether
/// to stop there.
pub fn read_matrices(
    container: &mut dyn MatrixContainer,
    names: &[String],
    options: ReadOptions,
    sink: &mut dyn DiagnosticSink,
) -> Extraction {
    let mut extraction = Extraction::default();

    for name in names {
        let split = container
            .read(name)
            .and_then(|tensor| split_tensor(name, tensor, options));

        match split {
            Ok((shape, matrices)) => {
                sink.info(format!(
                    "Read a matrix of size '{:?}' from '{}'.",
                    shape, name
                ));
                extraction.matrices.extend(matrices);
            }
            Err(e) => {
                sink.error(e.to_string());
                extraction.failures.push(e);
            }
        }
    }

    if extraction.is_empty() {
        sink.warn(format!(
            "Failed to read any matrices from '{}'.",
            container.source()
        ));
    }

    extraction
}

/// Split one tensor into independent matrices according to its rank
fn split_tensor(
    name: &str,
    tensor: ArrayD<f64>,
    options: ReadOptions,
) -> Result<(Vec<usize>, Vec<Array2<f64>>), ExhibitError> {
    let shape = tensor.shape().to_vec();
    let unsupported = || ExhibitError::UnsupportedShape {
        name: name.to_string(),
        shape: shape.clone(),
    };

    let matrices = match tensor.ndim() {
        2 if !options.stacked_only => {
            let mat = tensor.into_dimensionality::<Ix2>().map_err(|_| unsupported())?;
            if options.transpose {
                vec![mat.reversed_axes()]
            } else {
                vec![mat]
            }
        }
        3 => {
            let stack = tensor.into_dimensionality::<Ix3>().map_err(|_| unsupported())?;
            let axis = if options.transpose || options.stacked_only {
                Axis(2)
            } else {
                Axis(0)
            };
            stack
                .axis_iter(axis)
                .map(|slice| slice.to_owned())
                .collect()
        }
        _ => return Err(unsupported()),
    };

    Ok((shape, matrices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exhibit::container::MemoryContainer;
    use crate::exhibit::logger::{MemorySink, Severity};
    use ndarray::{array, Array, Array3, Array4};
    use proptest::prelude::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn stack(n: usize, rows: usize, cols: usize) -> Array3<f64> {
        Array::from_shape_fn((n, rows, cols), |(k, i, j)| (100 * k + 10 * i + j) as f64)
    }

    #[test]
    fn test_rank3_first_axis() {
        let mut container = MemoryContainer::new("mem").with_array("m", stack(3, 4, 4));
        let mut sink = MemorySink::new();
        let out = read_matrices(
            &mut container,
            &names(&["m"]),
            ReadOptions::exhibits(false),
            &mut sink,
        );

        assert!(out.failures.is_empty());
        assert_eq!(out.matrices.len(), 3);
        assert_eq!(out.matrices[2].dim(), (4, 4));
        assert_eq!(out.matrices[2][[1, 3]], 213.0);
        assert!(sink.contains(Severity::Info, "[3, 4, 4]"));
    }

    #[test]
    fn test_rank3_last_axis_when_transposed() {
        let mut container = MemoryContainer::new("mem").with_array("m", stack(2, 3, 5));
        let mut sink = MemorySink::new();
        let out = read_matrices(
            &mut container,
            &names(&["m"]),
            ReadOptions::exhibits(true),
            &mut sink,
        );

        assert_eq!(out.matrices.len(), 5);
        assert_eq!(out.matrices[4].dim(), (2, 3));
        assert_eq!(out.matrices[4][[1, 2]], 124.0);
    }

    #[test]
    fn test_rank2_transpose() {
        let mut container =
            MemoryContainer::new("mem").with_array("m", array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let mut sink = MemorySink::new();
        let out = read_matrices(
            &mut container,
            &names(&["m"]),
            ReadOptions::exhibits(true),
            &mut sink,
        );
        assert_eq!(out.matrices, vec![array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]]);
    }

    #[test]
    fn test_partial_failure_continues() {
        let mut container = MemoryContainer::new("mem")
            .with_array("bad", Array4::<f64>::zeros((2, 2, 2, 2)))
            .with_opaque("cell", "cell")
            .with_array("good", array![[1.0]]);
        let mut sink = MemorySink::new();
        let out = read_matrices(
            &mut container,
            &names(&["missing", "bad", "cell", "good"]),
            ReadOptions::exhibits(false),
            &mut sink,
        );

        assert_eq!(out.matrices.len(), 1);
        assert_eq!(out.failures.len(), 3);
        assert!(matches!(out.failures[0], ExhibitError::MissingVariable { .. }));
        assert!(matches!(out.failures[1], ExhibitError::UnsupportedShape { .. }));
        assert!(matches!(
            out.failures[2],
            ExhibitError::UnsupportedElementType { .. }
        ));
        assert_eq!(sink.messages(Severity::Error).len(), 3);
        assert!(sink.messages(Severity::Warning).is_empty());
    }

    #[test]
    fn test_stacked_only_rejects_rank2() {
        let mut container = MemoryContainer::new("mem").with_array("m", Array2::<f64>::eye(3));
        let mut sink = MemorySink::new();
        let out = read_matrices(
            &mut container,
            &names(&["m"]),
            ReadOptions::stacked(),
            &mut sink,
        );

        assert!(out.is_empty());
        assert!(matches!(
            &out.failures[0],
            ExhibitError::UnsupportedShape { shape, .. } if shape == &vec![3, 3]
        ));
        assert!(sink.contains(Severity::Warning, "Failed to read any matrices from 'mem'"));
    }

    proptest! {
        #[test]
        fn prop_transpose_roundtrip(r in 1usize..6, c in 1usize..6, seed in -1e3f64..1e3) {
            let original = Array2::from_shape_fn((r, c), |(i, j)| seed + (i * c + j) as f64 * 0.5);
            let mut container = MemoryContainer::new("mem").with_array("m", original.clone());
            let mut sink = MemorySink::new();
            let out = read_matrices(&mut container, &names(&["m"]), ReadOptions::exhibits(true), &mut sink);
            let back = out.matrices[0].t().to_owned();
            prop_assert_eq!(back, original);
        }
    }
}
