use crate::pipeline::domain::ApplicantRecord;

/// Storage abstraction over the registered-member directory so the
/// pipeline can be exercised against in-memory fakes.
///
/// `insert_if_absent` must be atomic: two jobs racing to commit the same
/// new ID number must observe exactly one `Inserted` and one
/// `AlreadyExists`.
pub trait MemberDirectory: Send + Sync {
    fn exists_by_id_number(&self, id_number: &str) -> Result<bool, DirectoryError>;
    fn insert_if_absent(&self, record: &ApplicantRecord) -> Result<InsertOutcome, DirectoryError>;
    fn count_existing(&self) -> Result<u64, DirectoryError>;
}

/// Result of an atomic insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Error enumeration for directory failures. `Rejected` is a per-record
/// problem and never fails the job; `Unavailable` aborts the stream.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("record rejected by member directory: {0}")]
    Rejected(String),
    #[error("member directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

/// Referential lookups for geographic codes, provided by the hosting
/// application.
pub trait GeoLookup: Send + Sync {
    fn is_valid_ward_code(&self, code: &str) -> bool;
    fn is_valid_voting_district_code(&self, code: &str) -> bool;
}
