use crate::pipeline::directory::{DirectoryError, GeoLookup, InsertOutcome, MemberDirectory};
use crate::pipeline::domain::{
    DuplicateKind, JobCounters, RawApplicantRow, RowOutcome, RowResult, ValidationIssue,
    ValidationOutcome,
};
use crate::pipeline::duplicates::DuplicateDetector;
use crate::pipeline::source::{RawRow, RowSource};
use crate::pipeline::validation::RecordValidator;
use std::sync::Arc;
use tracing::warn;

/// Streams one upload through validation, duplicate detection, and the
/// member directory, classifying every row into exactly one outcome.
///
/// Rows are pulled one at a time and the task yields at every row
/// boundary, so concurrent jobs interleave and memory stays bounded by a
/// single row plus the accumulated outcome list.
pub struct BatchProcessor {
    validator: RecordValidator,
    directory: Arc<dyn MemberDirectory>,
    geo: Arc<dyn GeoLookup>,
}

/// Everything a job produced, including partial output when the stream
/// died mid-file.
#[derive(Debug)]
pub struct BatchRun {
    pub rows: Vec<RowResult>,
    pub counters: JobCounters,
    /// Present when a file-level error aborted the stream. Rows processed
    /// before the abort are retained above.
    pub failure: Option<String>,
}

impl BatchProcessor {
    pub fn new(
        validator: RecordValidator,
        directory: Arc<dyn MemberDirectory>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        Self {
            validator,
            directory,
            geo,
        }
    }

    pub async fn process(&self, mut source: Box<dyn RowSource>) -> BatchRun {
        let mut rows = Vec::new();
        let mut counters = JobCounters::default();
        let mut detector = DuplicateDetector::new();
        let mut row_number: u64 = 0;

        let failure = loop {
            let next = match source.next_row() {
                Ok(next) => next,
                Err(err) => {
                    warn!(row = row_number, error = %err, "upload stream aborted");
                    break Some(err.to_string());
                }
            };
            let Some(raw_row) = next else {
                break None;
            };
            row_number += 1;

            let (raw, outcome) = match raw_row {
                RawRow::Malformed { detail } => (
                    RawApplicantRow::default(),
                    Ok(RowOutcome::Invalid {
                        issues: vec![ValidationIssue::RowShape { detail }],
                    }),
                ),
                RawRow::Applicant(raw) => {
                    let outcome = self.classify(row_number, &raw, &mut detector);
                    (raw, outcome)
                }
            };

            match outcome {
                Ok(outcome) => {
                    counters.record(outcome.category());
                    rows.push(RowResult {
                        row: row_number,
                        raw,
                        outcome,
                    });
                }
                Err(err) => {
                    warn!(row = row_number, error = %err, "member directory unreachable, aborting upload");
                    break Some(err.to_string());
                }
            }

            // Row boundary: let other jobs' I/O interleave.
            tokio::task::yield_now().await;
        };

        BatchRun {
            rows,
            counters,
            failure,
        }
    }

    /// Classify one well-shaped row. Only a fatal directory error escapes;
    /// every per-record problem becomes an outcome.
    fn classify(
        &self,
        row_number: u64,
        raw: &RawApplicantRow,
        detector: &mut DuplicateDetector,
    ) -> Result<RowOutcome, DirectoryError> {
        let record = match self.validator.validate(raw, self.geo.as_ref()) {
            ValidationOutcome::Valid(record) => record,
            ValidationOutcome::Invalid(issues) => return Ok(RowOutcome::Invalid { issues }),
        };

        if let Some(kind) = detector.classify(row_number, &record.id_number, self.directory.as_ref())?
        {
            return Ok(RowOutcome::Duplicate(kind));
        }

        match self.directory.insert_if_absent(&record) {
            Ok(InsertOutcome::Inserted) => Ok(RowOutcome::Valid(record)),
            // Another job committed the same ID number between our lookup
            // and the insert.
            Ok(InsertOutcome::AlreadyExists) => {
                Ok(RowOutcome::Duplicate(DuplicateKind::AlreadyRegistered))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => Ok(RowOutcome::Failed {
                cause: err.to_string(),
            }),
        }
    }
}
