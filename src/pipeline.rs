//! Exhibit generation pipeline
//!
//! The pipeline:
//! 1. Validates the configuration (bounding box, escape radius ceiling)
//! 2. Reads all requested matrices from the container
//! 3. Transforms each matrix, estimates its escape radius and writes it
//! 4. Optionally writes the average of all transformed matrices
//!
//! A failed variable or a failed write is logged and recorded in the
//! returned `RunReport`; the remaining matrices are still written.

use crate::config::ExhibitConfig;
use crate::exhibit::spectral::{condition_number, singular_values};
use crate::exhibit::{
    read_matrices, transform, write_exhibit, BoundingBox, DiagnosticSink, EscapeRadius,
    ExhibitError, ExhibitRecord, MatrixContainer, ReadOptions, Result, RunReport,
};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Suffix of the averaged exhibit
pub const AVERAGE_SUFFIX: &str = "avg";

/// Generate exhibit files for every matrix in `container`
///
/// # Arguments
/// * `container` - Source of the matrices
/// * `config` - Run configuration; validated before anything is read
/// * `output_base` - Base file name, exhibits are written as `{stem}-{suffix}.{ext}`
/// * `sink` - Receiver for progress and error diagnostics
///
/// # Returns
/// The paths written, with every non-fatal failure. Configuration errors are
/// returned as `Err` and nothing is written.
pub fn generate_exhibits(
    container: &mut dyn MatrixContainer,
    config: &ExhibitConfig,
    output_base: &Path,
    sink: &mut dyn DiagnosticSink,
) -> Result<RunReport<Vec<PathBuf>>> {
    config.validate()?;

    let extraction = read_matrices(
        container,
        &config.variables,
        ReadOptions::exhibits(config.transform.transpose),
        sink,
    );

    let mut report = RunReport::new(Vec::new());
    report.extend(extraction.failures);

    let matrices = extraction.matrices;
    if matrices.is_empty() {
        return Ok(report);
    }

    let width = suffix_width(matrices.len());
    let mut total: Option<Array2<f64>> = None;
    let mut mismatch: Option<ExhibitError> = None;

    for (i, mat) in matrices.iter().enumerate() {
        let transformed = transform(mat, &config.transform);

        if config.include_average && mismatch.is_none() {
            match total.as_mut() {
                None => total = Some(transformed.clone()),
                Some(acc) if acc.dim() == transformed.dim() => *acc += &transformed,
                Some(acc) => {
                    mismatch = Some(ExhibitError::ShapeMismatch {
                        expected: acc.dim(),
                        found: transformed.dim(),
                    })
                }
            }
        }

        let path = exhibit_path(output_base, &format!("{:0width$}", i, width = width));
        dump(&path, &transformed, config, sink, &mut report);
    }

    if config.include_average {
        match (mismatch, total) {
            (Some(e), _) => {
                sink.error(e.to_string());
                report.record(e);
            }
            (None, Some(total)) => {
                let average = total / matrices.len() as f64;
                let path = exhibit_path(output_base, AVERAGE_SUFFIX);
                dump(&path, &average, config, sink, &mut report);
            }
            (None, None) => {}
        }
    }

    Ok(report)
}

/// Estimate, encode and write one exhibit, folding any failure into `report`
fn dump(
    path: &Path,
    mat: &Array2<f64>,
    config: &ExhibitConfig,
    sink: &mut dyn DiagnosticSink,
    report: &mut RunReport<Vec<PathBuf>>,
) {
    match write_one(path, mat, config.bounding_box, config, sink) {
        Ok(()) => {
            sink.info(format!("Saved matrix in '{}'.", path.display()));
            report.output.push(path.to_path_buf());
        }
        Err(e) => {
            sink.error(e.to_string());
            report.record(e);
        }
    }
}

fn write_one(
    path: &Path,
    mat: &Array2<f64>,
    bbox: BoundingBox,
    config: &ExhibitConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<()> {
    if !config.overwrite && path.exists() {
        return Err(ExhibitError::OutputExists(path.to_path_buf()));
    }

    let sigma = singular_values(mat);
    let radius = EscapeRadius::from_singular_values(mat.nrows(), &sigma, config.max_escape_radius);

    sink.info(format!(
        "Dumping exhibit '{}': shape {:?} (cond {:.3e}) escape radius {} (real {})",
        path.file_stem().unwrap_or_default().to_string_lossy(),
        mat.shape(),
        condition_number(&sigma),
        radius.emitted,
        radius.estimated,
    ));

    let record = ExhibitRecord::new(mat, radius.emitted, bbox);
    write_exhibit(path, &record, config.overwrite)
}

/// Number of digits in exhibit indices: enough for `count`, at least two
pub fn suffix_width(count: usize) -> usize {
    count.to_string().len().max(2)
}

/// `{dir}/{stem}-{suffix}.{ext}`, with `json` as the fallback extension
pub fn exhibit_path(base: &Path, suffix: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "exhibit".to_string());
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());

    base.with_file_name(format!("{}-{}.{}", stem, suffix, extension))
}
