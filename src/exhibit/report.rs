//! Aggregate status of a batch run
//!
//! A run keeps going when a single variable or a single write fails. Each of
//! those failures is logged where it happens and folded into a `RunReport`,
//! which decides the final status and process exit code.

use super::error::ExhibitError;

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialFailure,
}

/// Output of a batch together with every non-fatal failure it encountered
#[derive(Debug)]
pub struct RunReport<T> {
    pub output: T,
    pub failures: Vec<ExhibitError>,
}

impl<T> RunReport<T> {
    pub fn new(output: T) -> Self {
        Self {
            output,
            failures: Vec::new(),
        }
    }

    /// Fold a failure into the report
    pub fn record(&mut self, error: ExhibitError) {
        self.failures.push(error);
    }

    /// Fold a batch of failures into the report
    pub fn extend(&mut self, errors: impl IntoIterator<Item = ExhibitError>) {
        self.failures.extend(errors);
    }

    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Success
    }

    /// Process exit code: 0 on full success, 1 if anything failed
    pub fn exit_code(&self) -> u8 {
        match self.status() {
            RunStatus::Success => 0,
            RunStatus::PartialFailure => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_report_is_success() {
        let report = RunReport::new(Vec::<PathBuf>::new());
        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_any_failure_is_partial() {
        let mut report = RunReport::new(());
        report.record(ExhibitError::OutputExists(PathBuf::from("a-0.json")));
        report.extend([ExhibitError::MissingVariable {
            name: "m".into(),
            source_name: "data.mat".into(),
        }]);

        assert_eq!(report.status(), RunStatus::PartialFailure);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.exit_code(), 1);
    }
}
