use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier wrapper for submitted uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadJobId(pub Uuid);

impl UploadJobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UploadJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One spreadsheet row as read from the upload, before any validation.
///
/// Every field is optional so that ragged input reaches the validator as
/// data instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawApplicantRow {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub id_number: Option<String>,
    pub cell_number: Option<String>,
    pub ward_code: Option<String>,
    pub voting_district_code: Option<String>,
}

/// The normalized applicant produced when every validation rule passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub first_name: String,
    pub surname: String,
    /// Exactly 13 decimal digits with a verified checksum.
    pub id_number: String,
    /// Canonical 10-digit local form (`0` + 9 digits).
    pub cell_number: String,
    pub ward_code: String,
    pub voting_district_code: String,
}

/// A single reason a row failed validation. Variants are deliberately
/// fine-grained so reports and tests can point at the exact rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("ID number must be exactly 13 digits")]
    IdFormat,
    #[error("ID number month {month:02} is outside 01-12")]
    IdMonth { month: u32 },
    #[error("ID number day {day:02} is outside 01-31")]
    IdDay { day: u32 },
    #[error("ID number day {day:02} does not exist in {year}-{month:02}")]
    IdCalendarDate { year: i32, month: u32, day: u32 },
    #[error("ID number birth date {date} is in the future")]
    IdFutureDate { date: NaiveDate },
    #[error("ID number check digit is {found}, expected {expected}")]
    IdChecksum { expected: u32, found: u32 },
    #[error("cell number is missing")]
    CellMissing,
    #[error("cell number '{raw}' is not a recognized South African mobile format")]
    CellShape { raw: String },
    #[error("cell number prefix {prefix} is not an allocated mobile prefix")]
    CellPrefix { prefix: String },
    #[error("ward code is missing")]
    WardMissing,
    #[error("ward code {code} is not a known ward")]
    WardUnknown { code: String },
    #[error("voting district code is missing")]
    VotingDistrictMissing,
    #[error("voting district code {code} is not a known voting district")]
    VotingDistrictUnknown { code: String },
    #[error("required field '{field}' is missing")]
    MissingField { field: String },
    #[error("row does not match the expected column layout: {detail}")]
    RowShape { detail: String },
}

/// Result of running the validator over one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ApplicantRecord),
    /// Ordered, non-empty list of every rule the row violated.
    Invalid(Vec<ValidationIssue>),
}

/// Why a row was classified as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateKind {
    /// An earlier row in the same upload carries the same ID number.
    WithinFile { first_row: u64 },
    /// The member directory already holds this ID number.
    AlreadyRegistered,
}

/// Final classification for one processed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Valid(ApplicantRecord),
    Invalid { issues: Vec<ValidationIssue> },
    Duplicate(DuplicateKind),
    /// Semantically valid but the directory refused the commit.
    Failed { cause: String },
}

impl RowOutcome {
    pub fn category(&self) -> OutcomeCategory {
        match self {
            RowOutcome::Valid(_) => OutcomeCategory::Valid,
            RowOutcome::Invalid { .. } => OutcomeCategory::Invalid,
            RowOutcome::Duplicate(_) => OutcomeCategory::Duplicate,
            RowOutcome::Failed { .. } => OutcomeCategory::Failed,
        }
    }
}

/// One processed row paired with its file position (1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    pub row: u64,
    pub raw: RawApplicantRow,
    pub outcome: RowOutcome,
}

/// The four buckets a processed row can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    Valid,
    Duplicate,
    Invalid,
    Failed,
}

impl OutcomeCategory {
    /// Fixed report ordering.
    pub const REPORT_ORDER: [OutcomeCategory; 4] = [
        OutcomeCategory::Valid,
        OutcomeCategory::Duplicate,
        OutcomeCategory::Invalid,
        OutcomeCategory::Failed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            OutcomeCategory::Valid => "valid",
            OutcomeCategory::Duplicate => "duplicate",
            OutcomeCategory::Invalid => "invalid",
            OutcomeCategory::Failed => "failed",
        }
    }
}

/// Lifecycle of an upload job. `Pending` jobs may be cancelled; the three
/// remaining states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::Cancelled
        )
    }
}

/// Scheduling bucket derived from the declared row count. Smaller uploads
/// outrank larger ones so they are not starved behind bulk files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Small,
    Medium,
    Large,
}

impl PriorityTier {
    pub const fn label(self) -> &'static str {
        match self {
            PriorityTier::Small => "small",
            PriorityTier::Medium => "medium",
            PriorityTier::Large => "large",
        }
    }
}

/// Per-job tallies updated as rows are classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub duplicate: u64,
    pub failed: u64,
}

impl JobCounters {
    pub fn record(&mut self, category: OutcomeCategory) {
        self.total += 1;
        match category {
            OutcomeCategory::Valid => self.valid += 1,
            OutcomeCategory::Invalid => self.invalid += 1,
            OutcomeCategory::Duplicate => self.duplicate += 1,
            OutcomeCategory::Failed => self.failed += 1,
        }
    }
}

/// Point-in-time view of a job handed to status pollers.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSnapshot {
    pub job_id: UploadJobId,
    pub owner: String,
    pub status: UploadStatus,
    pub priority: PriorityTier,
    pub counters: JobCounters,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_cause: Option<String>,
}
