//! Shared fakes and builders for pipeline tests.

use crate::config::PipelineConfig;
use crate::pipeline::directory::{DirectoryError, GeoLookup, InsertOutcome, MemberDirectory};
use crate::pipeline::domain::{ApplicantRecord, RawApplicantRow};
use crate::pipeline::source::{RawRow, RowSource, SourceError};
use crate::pipeline::validation::RecordValidator;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub(crate) const REFERENCE_DATE: (i32, u32, u32) = (2026, 8, 26);

pub(crate) fn reference_date() -> NaiveDate {
    let (year, month, day) = REFERENCE_DATE;
    NaiveDate::from_ymd_opt(year, month, day).expect("valid reference date")
}

pub(crate) fn pinned_validator() -> RecordValidator {
    RecordValidator::new(&PipelineConfig::default()).with_reference_date(reference_date())
}

pub(crate) struct OpenGeo;

impl GeoLookup for OpenGeo {
    fn is_valid_ward_code(&self, _code: &str) -> bool {
        true
    }

    fn is_valid_voting_district_code(&self, _code: &str) -> bool {
        true
    }
}

/// In-memory member directory with optional failure injection.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    ids: Mutex<HashSet<String>>,
    /// When set, `insert_if_absent` rejects (record-level) after this many
    /// successful inserts.
    reject_after: Option<u64>,
    /// When set, every directory call fails as unavailable (job-level).
    unavailable: bool,
    inserts: AtomicU64,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seeded(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_after(inserts: u64) -> Self {
        Self {
            reject_after: Some(inserts),
            ..Self::default()
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn contains(&self, id_number: &str) -> bool {
        self.ids.lock().expect("ids mutex").contains(id_number)
    }
}

impl MemberDirectory for FakeDirectory {
    fn exists_by_id_number(&self, id_number: &str) -> Result<bool, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("store offline".to_string()));
        }
        Ok(self.ids.lock().expect("ids mutex").contains(id_number))
    }

    fn insert_if_absent(&self, record: &ApplicantRecord) -> Result<InsertOutcome, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("store offline".to_string()));
        }
        if let Some(limit) = self.reject_after {
            if self.inserts.load(Ordering::SeqCst) >= limit {
                return Err(DirectoryError::Rejected("write rejected".to_string()));
            }
        }
        let mut ids = self.ids.lock().expect("ids mutex");
        if ids.insert(record.id_number.clone()) {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    fn count_existing(&self) -> Result<u64, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("store offline".to_string()));
        }
        Ok(self.ids.lock().expect("ids mutex").len() as u64)
    }
}

/// Row source backed by a vector, with optional mid-stream failure.
pub(crate) struct VecRowSource {
    rows: std::vec::IntoIter<RawApplicantRow>,
    fail_after: Option<u64>,
    served: u64,
}

impl VecRowSource {
    pub(crate) fn new(rows: Vec<RawApplicantRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            fail_after: None,
            served: 0,
        }
    }

    /// Serve this many rows, then error as if the file became unreadable.
    pub(crate) fn failing_after(rows: Vec<RawApplicantRow>, served_rows: u64) -> Self {
        Self {
            rows: rows.into_iter(),
            fail_after: Some(served_rows),
            served: 0,
        }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        if let Some(limit) = self.fail_after {
            if self.served >= limit {
                return Err(SourceError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "upload truncated",
                )));
            }
        }
        match self.rows.next() {
            Some(row) => {
                self.served += 1;
                Ok(Some(RawRow::Applicant(row)))
            }
            None => Ok(None),
        }
    }
}

pub(crate) fn applicant(id_number: &str, cell_number: &str) -> RawApplicantRow {
    RawApplicantRow {
        first_name: Some("Thandi".to_string()),
        surname: Some("Mokoena".to_string()),
        id_number: Some(id_number.to_string()),
        cell_number: Some(cell_number.to_string()),
        ward_code: Some("79800001".to_string()),
        voting_district_code: Some("32840012".to_string()),
    }
}

/// Valid ID numbers (checksum included) usable across tests.
pub(crate) const VALID_IDS: [&str; 4] = [
    "8001015009087",
    "9202204720083",
    "7501010001089",
    "6812120002086",
];
