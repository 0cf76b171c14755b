use crate::pipeline::directory::{DirectoryError, MemberDirectory};
use crate::pipeline::domain::DuplicateKind;
use std::collections::HashMap;

/// Tracks the ID numbers accepted so far in one upload, in file order.
///
/// Later occurrences of an ID already seen in the file are duplicates of
/// the first occurrence. A first occurrence is still checked against the
/// member directory, and loses to an already-registered member; only an
/// ID that clears both checks is recorded as the file's first occurrence.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: HashMap<String, u64>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one row's ID number. The within-file map is consulted
    /// first so that repeats keep referencing the original row even after
    /// it has been committed to the directory.
    pub fn classify(
        &mut self,
        row: u64,
        id_number: &str,
        directory: &dyn MemberDirectory,
    ) -> Result<Option<DuplicateKind>, DirectoryError> {
        if let Some(first_row) = self.seen.get(id_number) {
            return Ok(Some(DuplicateKind::WithinFile {
                first_row: *first_row,
            }));
        }
        if self.check_persisted(id_number, directory)? {
            return Ok(Some(DuplicateKind::AlreadyRegistered));
        }
        self.seen.insert(id_number.to_string(), row);
        Ok(None)
    }

    /// Directory-only pass.
    pub fn check_persisted(
        &self,
        id_number: &str,
        directory: &dyn MemberDirectory,
    ) -> Result<bool, DirectoryError> {
        directory.exists_by_id_number(id_number)
    }
}
