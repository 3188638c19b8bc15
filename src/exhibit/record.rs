//! Exhibit records and their JSON encoding
//!
//! An exhibit is the file `netbrot` loads to know what to render:
//!
//! ```json
//! {
//!   "mat": [[[m00, 0.0], [m10, 0.0], ...], rows, cols],
//!   "escape_radius": 1.0,
//!   "upper_left": [ux, uy],
//!   "lower_right": [lx, ly]
//! }
//! ```
//!
//! The matrix is stored column-major as `(real, imaginary)` pairs, because
//! the renderer works on complex column-major matrices. Key order is part of
//! the format.

use super::error::{ExhibitError, Result};
use ndarray::{Array2, ShapeBuilder};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::ser::{CharEscape, Formatter, PrettyFormatter};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Default viewport corners used by the renderer
pub const DEFAULT_UPPER_LEFT: [f64; 2] = [-10.25, 4.25];
pub const DEFAULT_LOWER_RIGHT: [f64; 2] = [7.5, -7.5];

/// Rendering viewport in physical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub upper_left: [f64; 2],
    pub lower_right: [f64; 2],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            upper_left: DEFAULT_UPPER_LEFT,
            lower_right: DEFAULT_LOWER_RIGHT,
        }
    }
}

impl BoundingBox {
    /// Build from axis limits `(xmin, xmax)` and `(ymin, ymax)`
    pub fn from_limits(xlim: (f64, f64), ylim: (f64, f64)) -> Self {
        Self {
            upper_left: [xlim.0, ylim.1],
            lower_right: [xlim.1, ylim.0],
        }
    }

    /// Check that both corners are finite and `upper_left` is left of and
    /// above `lower_right`
    pub fn validate(&self) -> Result<()> {
        let [ux, uy] = self.upper_left;
        let [lx, ly] = self.lower_right;

        // Written so that NaN coordinates are rejected as well
        if !(ux.is_finite() && lx.is_finite() && ux <= lx) {
            return Err(ExhibitError::InvalidBounds {
                axis: 'x',
                min: ux,
                max: lx,
            });
        }
        if !(uy.is_finite() && ly.is_finite() && uy >= ly) {
            return Err(ExhibitError::InvalidBounds {
                axis: 'y',
                min: ly,
                max: uy,
            });
        }

        Ok(())
    }
}

/// One serialized exhibit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhibitRecord {
    #[serde(serialize_with = "serialize_matrix")]
    pub mat: (Vec<[f64; 2]>, usize, usize),
    #[serde(serialize_with = "serialize_real")]
    pub escape_radius: f64,
    #[serde(serialize_with = "serialize_point")]
    pub upper_left: [f64; 2],
    #[serde(serialize_with = "serialize_point")]
    pub lower_right: [f64; 2],
}

impl ExhibitRecord {
    pub fn new(mat: &Array2<f64>, escape_radius: f64, bbox: BoundingBox) -> Self {
        let (rows, cols) = mat.dim();
        // Iterating the transposed view walks the source column by column
        let entries = mat.t().iter().map(|&v| [v, 0.0]).collect();

        Self {
            mat: (entries, rows, cols),
            escape_radius,
            upper_left: bbox.upper_left,
            lower_right: bbox.lower_right,
        }
    }

    pub fn rows(&self) -> usize {
        self.mat.1
    }

    pub fn cols(&self) -> usize {
        self.mat.2
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            upper_left: self.upper_left,
            lower_right: self.lower_right,
        }
    }

    /// Rebuild the real part of the matrix
    pub fn matrix(&self) -> Result<Array2<f64>> {
        let (entries, rows, cols) = &self.mat;
        let real = entries.iter().map(|pair| pair[0]).collect();
        Array2::from_shape_vec((*rows, *cols).f(), real).map_err(|e| {
            ExhibitError::InvalidConfig(format!("exhibit matrix does not match its shape: {}", e))
        })
    }

    /// Encode as pretty printed JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut serializer =
            serde_json::Serializer::with_formatter(writer, NonFiniteFormatter::default());
        self.serialize(&mut serializer)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        // The formatter only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Parse a record (finite values only)
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Write `record` to `path`
///
/// Without `overwrite` an existing file is left untouched and reported as
/// [`ExhibitError::OutputExists`]. The file is closed on every exit path; a
/// failed write may leave a partial file behind.
pub fn write_exhibit(path: &Path, record: &ExhibitRecord, overwrite: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let file = options.open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            ExhibitError::OutputExists(path.to_path_buf())
        } else {
            ExhibitError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let io_error = |source: io::Error| ExhibitError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(file);
    record.to_writer(&mut writer).map_err(|e| match e {
        ExhibitError::Json(json) if json.is_io() => io_error(json.into()),
        other => other,
    })?;
    writer.flush().map_err(io_error)
}

/// Read an exhibit file back
pub fn read_exhibit(path: &Path) -> Result<ExhibitRecord> {
    let file = File::open(path).map_err(|e| ExhibitError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    ExhibitRecord::from_reader(BufReader::new(file))
}

// ============================================================================
// Non-finite floats
// ============================================================================

const POS_INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";
const NOT_A_NUMBER: &str = "NaN";

/// Serialize a float, sending non-finite values as marker strings that
/// [`NonFiniteFormatter`] writes back out as bare tokens
fn serialize_real<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str(NOT_A_NUMBER)
    } else if value.is_infinite() && *value > 0.0 {
        serializer.serialize_str(POS_INFINITY)
    } else if value.is_infinite() {
        serializer.serialize_str(NEG_INFINITY)
    } else {
        serializer.serialize_f64(*value)
    }
}

struct Real(f64);

impl Serialize for Real {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_real(&self.0, serializer)
    }
}

fn serialize_point<S: Serializer>(
    point: &[f64; 2],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    [Real(point[0]), Real(point[1])].serialize(serializer)
}

fn serialize_matrix<S: Serializer>(
    mat: &(Vec<[f64; 2]>, usize, usize),
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeTuple;

    struct Entries<'a>(&'a [[f64; 2]]);

    impl Serialize for Entries<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            serializer.collect_seq(self.0.iter().map(|[re, im]| [Real(*re), Real(*im)]))
        }
    }

    let mut tuple = serializer.serialize_tuple(3)?;
    tuple.serialize_element(&Entries(&mat.0))?;
    tuple.serialize_element(&mat.1)?;
    tuple.serialize_element(&mat.2)?;
    tuple.end()
}

/// Pretty printer (2-space indent) that writes `Infinity`, `-Infinity` and
/// `NaN` without quotes
///
/// Exhibit records contain no string values, so any string equal to one of
/// the markers is a non-finite float.
#[derive(Default)]
struct NonFiniteFormatter {
    inner: PrettyFormatter<'static>,
    pending: Vec<u8>,
}

impl NonFiniteFormatter {
    fn is_marker(bytes: &[u8]) -> bool {
        [POS_INFINITY, NEG_INFINITY, NOT_A_NUMBER]
            .iter()
            .any(|m| m.as_bytes() == bytes)
    }
}

impl Formatter for NonFiniteFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn begin_string<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, _writer: &mut W, fragment: &str) -> io::Result<()> {
        self.pending.extend_from_slice(fragment.as_bytes());
        Ok(())
    }

    fn write_char_escape<W: ?Sized + Write>(&mut self, _writer: &mut W, char_escape: CharEscape) -> io::Result<()> {
        self.inner.write_char_escape(&mut self.pending, char_escape)
    }

    fn end_string<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if Self::is_marker(&self.pending) {
            writer.write_all(&self.pending)
        } else {
            self.inner.begin_string(writer)?;
            writer.write_all(&self.pending)?;
            self.inner.end_string(writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_column_major_encoding() {
        let m = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let record = ExhibitRecord::new(&m, 2.5, BoundingBox::default());

        let reals: Vec<f64> = record.mat.0.iter().map(|p| p[0]).collect();
        assert_eq!(reals, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(record.mat.0.iter().all(|p| p[1] == 0.0));
        assert_eq!((record.rows(), record.cols()), (2, 3));
        assert_eq!(record.matrix().unwrap(), m);
    }

    #[test]
    fn test_layout_and_key_order() {
        let record = ExhibitRecord::new(&array![[1.0]], 0.5, BoundingBox::default());
        let json = record.to_json_string().unwrap();
        let expected = r#"{
  "mat": [
    [
      [
        1.0,
        0.0
      ]
    ],
    1,
    1
  ],
  "escape_radius": 0.5,
  "upper_left": [
    -10.25,
    4.25
  ],
  "lower_right": [
    7.5,
    -7.5
  ]
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_non_finite_tokens() {
        let m = array![[f64::NAN, f64::NEG_INFINITY]];
        let record = ExhibitRecord::new(&m, f64::INFINITY, BoundingBox::default());
        let json = record.to_json_string().unwrap();

        assert!(json.contains("\"escape_radius\": Infinity"));
        assert!(json.contains("NaN,"));
        assert!(json.contains("-Infinity,"));
        assert!(!json.contains("null"));
        assert!(json.contains("\"mat\""));
    }

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::default().validate().is_ok());

        let inverted_x = BoundingBox {
            upper_left: [5.0, 0.0],
            lower_right: [0.0, 0.0],
        };
        assert!(matches!(
            inverted_x.validate(),
            Err(ExhibitError::InvalidBounds { axis: 'x', .. })
        ));

        let inverted_y = BoundingBox::from_limits((0.0, 1.0), (2.0, 1.0));
        assert!(matches!(
            inverted_y.validate(),
            Err(ExhibitError::InvalidBounds { axis: 'y', .. })
        ));
    }

    #[test]
    fn test_bounding_box_rejects_infinite_corners() {
        let open_left = BoundingBox::from_limits((f64::NEG_INFINITY, 0.0), (0.0, 1.0));
        assert!(matches!(
            open_left.validate(),
            Err(ExhibitError::InvalidBounds { axis: 'x', .. })
        ));

        let open_top = BoundingBox::from_limits((0.0, 1.0), (0.0, f64::INFINITY));
        assert!(matches!(
            open_top.validate(),
            Err(ExhibitError::InvalidBounds { axis: 'y', .. })
        ));
    }

    #[test]
    fn test_non_finite_corners_are_tokens() {
        let bbox = BoundingBox {
            upper_left: [f64::NEG_INFINITY, 1.0],
            lower_right: [0.0, f64::NAN],
        };
        let record = ExhibitRecord::new(&array![[1.0]], 1.0, bbox);
        let json = record.to_json_string().unwrap();

        assert!(json.contains("\"upper_left\": [\n    -Infinity,\n    1.0\n  ]"));
        assert!(json.contains("\"lower_right\": [\n    0.0,\n    NaN\n  ]"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_from_limits() {
        let bbox = BoundingBox::from_limits((-10.25, 7.5), (-7.5, 4.25));
        assert_eq!(bbox, BoundingBox::default());
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exhibit-0.json");
        let record = ExhibitRecord::new(&Array2::eye(2), 1.0, BoundingBox::default());

        write_exhibit(&path, &record, false).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        let other = ExhibitRecord::new(&Array2::eye(3), 9.0, BoundingBox::default());
        let err = write_exhibit(&path, &other, false).unwrap_err();
        assert!(matches!(err, ExhibitError::OutputExists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);

        write_exhibit(&path, &other, true).unwrap();
        assert_eq!(read_exhibit(&path).unwrap(), other);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_names_the_file() {
        // Large enough to overflow the write buffer mid-record
        let path = Path::new("/dev/full");
        let record = ExhibitRecord::new(&Array2::eye(64), 1.0, BoundingBox::default());
        match write_exhibit(path, &record, true) {
            Err(ExhibitError::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("exhibit.json");
        let record = ExhibitRecord::new(&Array2::eye(2), 1.0, BoundingBox::default());
        assert!(matches!(
            write_exhibit(&path, &record, false),
            Err(ExhibitError::Io { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_serialize_parse(
            rows in 1usize..5,
            cols in 1usize..5,
            values in proptest::collection::vec(-1e6f64..1e6, 16),
            radius in 1e-6f64..1e6,
            ux in -100.0f64..0.0,
            lx in 0.0f64..100.0,
        ) {
            let m = Array2::from_shape_fn((rows, cols), |(i, j)| values[i * 4 + j]);
            let bbox = BoundingBox { upper_left: [ux, 3.0], lower_right: [lx, -3.0] };
            let record = ExhibitRecord::new(&m, radius, bbox);

            let json = record.to_json_string().unwrap();
            let parsed = ExhibitRecord::from_reader(json.as_bytes()).unwrap();

            prop_assert_eq!(parsed.rows(), rows);
            prop_assert_eq!(parsed.cols(), cols);
            prop_assert_eq!(parsed.escape_radius, radius);
            prop_assert_eq!(parsed.bounding_box(), bbox);

            let back = parsed.matrix().unwrap();
            for (a, b) in back.iter().zip(m.iter()) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }
}
