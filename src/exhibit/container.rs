//! Read-only matrix containers
//!
//! A container maps variable names to dense numeric tensors. The reader only
//! needs `read(name)`, so MATLAB files, NumPy archives and in-memory maps
//! all sit behind the same `MatrixContainer` trait.
//!
//! Every container hands out owned `f64` arrays: integer and single precision
//! data are widened, complex data is rejected.

use super::error::{ExhibitError, Result};
use ndarray::{Array, ArrayD, Dimension, IxDyn, OwnedRepr, ShapeBuilder};
use ndarray_npy::NpzReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Named-variable numeric container
pub trait MatrixContainer {
    /// Where the data came from (file path or a label), used in diagnostics
    fn source(&self) -> &str;

    /// Read a variable as a dense `f64` tensor of any rank
    fn read(&mut self, name: &str) -> Result<ArrayD<f64>>;
}

/// Open a container, choosing the format from the file extension
///
/// Supported: `.mat` (MATLAB level 5) and `.npz` (NumPy archive).
pub fn open_container(path: impl AsRef<Path>) -> Result<Box<dyn MatrixContainer>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mat") => Ok(Box::new(MatFileContainer::open(path)?)),
        Some("npz") => Ok(Box::new(NpzContainer::open(path)?)),
        other => Err(ExhibitError::Container {
            path: path.to_path_buf(),
            message: format!(
                "unsupported container extension {:?} (expected .mat or .npz)",
                other.unwrap_or("")
            ),
        }),
    }
}

fn container_error(path: &Path, message: impl ToString) -> ExhibitError {
    ExhibitError::Container {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

// ============================================================================
// MATLAB .mat files
// ============================================================================

/// MATLAB level 5 `.mat` file, parsed eagerly on open
pub struct MatFileContainer {
    source: String,
    file: matfile::MatFile,
}

impl MatFileContainer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let handle = File::open(path).map_err(|e| container_error(path, e))?;
        let file = matfile::MatFile::parse(BufReader::new(handle))
            .map_err(|e| container_error(path, format!("{:?}", e)))?;

        Ok(Self {
            source: path.display().to_string(),
            file,
        })
    }
}

impl MatrixContainer for MatFileContainer {
    fn source(&self) -> &str {
        &self.source
    }

    fn read(&mut self, name: &str) -> Result<ArrayD<f64>> {
        let array = self
            .file
            .find_by_name(name)
            .ok_or_else(|| ExhibitError::MissingVariable {
                name: name.to_string(),
                source_name: self.source.clone(),
            })?;

        let data = widen_matfile_data(name, array.data())?;

        // MATLAB stores arrays in column-major order
        let shape = IxDyn(array.size()).f();
        ArrayD::from_shape_vec(shape, data).map_err(|e| ExhibitError::UnsupportedElementType {
            name: name.to_string(),
            kind: format!("inconsistent array data ({})", e),
        })
    }
}

fn widen_matfile_data(name: &str, data: &matfile::NumericData) -> Result<Vec<f64>> {
    use matfile::NumericData as D;

    let widened = match data {
        D::Double { real, imag: None } => real.clone(),
        D::Single { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::Int8 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::UInt8 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::Int16 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::UInt16 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::Int32 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::UInt32 { real, imag: None } => real.iter().map(|&v| f64::from(v)).collect(),
        D::Int64 { real, imag: None } => real.iter().map(|&v| v as f64).collect(),
        D::UInt64 { real, imag: None } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(ExhibitError::UnsupportedElementType {
                name: name.to_string(),
                kind: "complex".to_string(),
            })
        }
    };

    Ok(widened)
}

// ============================================================================
// NumPy .npz archives
// ============================================================================

/// NumPy `.npz` archive; arrays are read lazily by name
pub struct NpzContainer {
    source: String,
    names: Vec<String>,
    reader: NpzReader<File>,
}

impl NpzContainer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let handle = File::open(path).map_err(|e| container_error(path, e))?;
        let mut reader = NpzReader::new(handle).map_err(|e| container_error(path, e))?;
        let names = reader
            .names()
            .map_err(|e| container_error(path, e))?
            .into_iter()
            .map(|n| n.trim_end_matches(".npy").to_string())
            .collect();

        Ok(Self {
            source: path.display().to_string(),
            names,
            reader,
        })
    }
}

impl MatrixContainer for NpzContainer {
    fn source(&self) -> &str {
        &self.source
    }

    fn read(&mut self, name: &str) -> Result<ArrayD<f64>> {
        if !self.names.iter().any(|n| n == name) {
            return Err(ExhibitError::MissingVariable {
                name: name.to_string(),
                source_name: self.source.clone(),
            });
        }

        let entry = format!("{}.npy", name);
        if let Ok(array) = self.reader.by_name::<OwnedRepr<f64>, IxDyn>(&entry) {
            return Ok(array);
        }
        if let Ok(array) = self.reader.by_name::<OwnedRepr<f32>, IxDyn>(&entry) {
            return Ok(array.mapv(f64::from));
        }
        if let Ok(array) = self.reader.by_name::<OwnedRepr<i64>, IxDyn>(&entry) {
            return Ok(array.mapv(|v| v as f64));
        }

        match self.reader.by_name::<OwnedRepr<i32>, IxDyn>(&entry) {
            Ok(array) => Ok(array.mapv(f64::from)),
            Err(e) => Err(ExhibitError::UnsupportedElementType {
                name: name.to_string(),
                kind: e.to_string(),
            }),
        }
    }
}

// ============================================================================
// In-memory container
// ============================================================================

/// Value stored in a [`MemoryContainer`]
#[derive(Debug, Clone)]
pub enum ContainerEntry {
    /// Dense real tensor
    Dense(ArrayD<f64>),
    /// Anything else (struct, cell array, string, ...), described by its type name
    Opaque(String),
}

/// In-memory container, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    label: String,
    entries: HashMap<String, ContainerEntry>,
}

impl MemoryContainer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: HashMap::new(),
        }
    }

    /// Add a dense array of any dimension
    pub fn with_array<D: Dimension>(mut self, name: &str, array: Array<f64, D>) -> Self {
        self.insert(name, ContainerEntry::Dense(array.into_dyn()));
        self
    }

    /// Add a non-numeric object
    pub fn with_opaque(mut self, name: &str, kind: &str) -> Self {
        self.insert(name, ContainerEntry::Opaque(kind.to_string()));
        self
    }

    pub fn insert(&mut self, name: &str, entry: ContainerEntry) {
        self.entries.insert(name.to_string(), entry);
    }
}

impl MatrixContainer for MemoryContainer {
    fn source(&self) -> &str {
        &self.label
    }

    fn read(&mut self, name: &str) -> Result<ArrayD<f64>> {
        match self.entries.get(name) {
            Some(ContainerEntry::Dense(array)) => Ok(array.clone()),
            Some(ContainerEntry::Opaque(kind)) => Err(ExhibitError::UnsupportedElementType {
                name: name.to_string(),
                kind: kind.clone(),
            }),
            None => Err(ExhibitError::MissingVariable {
                name: name.to_string(),
                source_name: self.label.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_memory_container_lookup() {
        let mut container = MemoryContainer::new("memory")
            .with_array("a", array![[1.0, 2.0], [3.0, 4.0]])
            .with_opaque("s", "struct");

        assert_eq!(container.read("a").unwrap().shape(), &[2, 2]);
        assert!(matches!(
            container.read("s"),
            Err(ExhibitError::UnsupportedElementType { .. })
        ));
        assert!(matches!(
            container.read("missing"),
            Err(ExhibitError::MissingVariable { .. })
        ));
    }

    #[test]
    fn test_memory_container_returns_copies() {
        let mut container =
            MemoryContainer::new("memory").with_array("m", Array3::<f64>::zeros((2, 3, 3)));
        let mut first = container.read("m").unwrap();
        first.fill(7.0);
        let second = container.read("m").unwrap();
        assert!(second.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_open_container_rejects_unknown_extension() {
        let result = open_container("data.csv");
        assert!(matches!(result, Err(ExhibitError::Container { .. })));
    }

    #[test]
    fn test_open_container_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_container(dir.path().join("absent.mat"));
        assert!(matches!(result, Err(ExhibitError::Container { .. })));
    }

    #[test]
    fn test_npz_roundtrip_widens_integers() {
        use ndarray_npy::NpzWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.npz");
        {
            let mut npz = NpzWriter::new(File::create(&path).unwrap());
            npz.add_array("floats", &array![[1.5, 2.5], [3.5, 4.5]])
                .unwrap();
            npz.add_array("ints", &array![[1i64, 2], [3, 4]]).unwrap();
            npz.finish().unwrap();
        }

        let mut container = open_container(&path).unwrap();
        let floats = container.read("floats").unwrap();
        assert_eq!(floats[[1, 0]], 3.5);
        let ints = container.read("ints").unwrap();
        assert_eq!(ints[[1, 1]], 4.0);
        assert!(matches!(
            container.read("nope"),
            Err(ExhibitError::MissingVariable { .. })
        ));
    }

    fn mat_fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/stack.mat")
    }

    #[test]
    fn test_mat_tensor_is_column_major() {
        let mut container = open_container(mat_fixture()).unwrap();
        let stack = container.read("stack").unwrap();

        // stack[a, b, c] = 100a + 10b + c
        assert_eq!(stack.shape(), &[3, 2, 2]);
        assert_eq!(stack[[2, 1, 0]], 210.0);
        assert_eq!(stack[[1, 0, 1]], 101.0);
        assert_eq!(stack[[0, 1, 1]], 11.0);
    }

    #[test]
    fn test_mat_widens_integers() {
        let mut container = MatFileContainer::open(mat_fixture()).unwrap();
        let counts = container.read("counts").unwrap();
        assert_eq!(counts.shape(), &[2, 2]);
        assert_eq!(counts[[0, 1]], 2.0);
        assert_eq!(counts[[1, 0]], 3.0);
    }

    #[test]
    fn test_mat_rejects_complex_and_missing() {
        let mut container = MatFileContainer::open(mat_fixture()).unwrap();
        assert!(matches!(
            container.read("waves"),
            Err(ExhibitError::UnsupportedElementType { ref kind, .. }) if kind == "complex"
        ));
        assert!(matches!(
            container.read("absent"),
            Err(ExhibitError::MissingVariable { .. })
        ));
    }
}
