//! The bulk-upload pipeline: row validation, duplicate detection,
//! streaming batch processing, the prioritized upload queue, and report
//! generation.

pub mod batch;
pub mod directory;
pub mod domain;
pub mod duplicates;
pub mod queue;
pub mod report;
pub mod router;
pub mod source;
pub mod validation;

#[cfg(test)]
mod tests;

pub use batch::{BatchProcessor, BatchRun};
pub use directory::{DirectoryError, GeoLookup, InsertOutcome, MemberDirectory};
pub use domain::{
    ApplicantRecord, DuplicateKind, JobCounters, OutcomeCategory, PriorityTier, RawApplicantRow,
    RowOutcome, RowResult, UploadJobId, UploadSnapshot, UploadStatus, ValidationIssue,
    ValidationOutcome,
};
pub use duplicates::DuplicateDetector;
pub use queue::{UploadError, UploadQueue};
pub use report::{build_report, ReportRow, ReportSection, UploadReport};
pub use router::upload_router;
pub use source::{CsvRowSource, RawRow, RowSource, SourceError};
pub use validation::RecordValidator;
