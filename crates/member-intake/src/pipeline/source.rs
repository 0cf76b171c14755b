use crate::pipeline::domain::RawApplicantRow;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

/// One forward pass over the rows of an uploaded file. Implementations
/// must never hold the whole file in memory.
pub trait RowSource: Send {
    /// The next row, `Ok(None)` at end of input. An `Err` is a fatal,
    /// file-level failure; per-row shape problems are reported as
    /// [`RawRow::Malformed`] so the job can keep going.
    fn next_row(&mut self) -> Result<Option<RawRow>, SourceError>;
}

/// A row as pulled from the source, before typing.
#[derive(Debug)]
pub enum RawRow {
    Applicant(RawApplicantRow),
    /// The row could not be mapped onto the expected columns.
    Malformed { detail: String },
}

/// Fatal errors raised while reading an upload.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload stream corrupted: {0}")]
    Csv(#[from] csv::Error),
}

/// Streaming CSV reader producing one [`RawApplicantRow`] at a time.
///
/// Column headers follow the standard application-sheet layout; cells are
/// trimmed and blank cells become `None` so the validator reports them as
/// missing rather than empty strings.
pub struct CsvRowSource<R: Read + Send> {
    rows: csv::DeserializeRecordsIntoIter<R, CsvApplicantRow>,
}

impl<R: Read + Send> std::fmt::Debug for CsvRowSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRowSource").finish_non_exhaustive()
    }
}

impl CsvRowSource<std::fs::File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Send> CsvRowSource<R> {
    pub fn new(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader)
            .into_deserialize::<CsvApplicantRow>();
        Self { rows }
    }
}

impl<R: Read + Send> RowSource for CsvRowSource<R> {
    fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        match self.rows.next() {
            None => Ok(None),
            Some(Ok(row)) => Ok(Some(RawRow::Applicant(row.into()))),
            // An underlying read failure is fatal for the whole upload;
            // any other per-row parse problem stays recoverable.
            Some(Err(err)) => {
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    Err(SourceError::Csv(err))
                } else {
                    Ok(Some(RawRow::Malformed {
                        detail: err.to_string(),
                    }))
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvApplicantRow {
    #[serde(rename = "First Name", default, deserialize_with = "empty_string_as_none")]
    first_name: Option<String>,
    #[serde(rename = "Surname", default, deserialize_with = "empty_string_as_none")]
    surname: Option<String>,
    #[serde(rename = "ID Number", default, deserialize_with = "empty_string_as_none")]
    id_number: Option<String>,
    #[serde(rename = "Cell Number", default, deserialize_with = "empty_string_as_none")]
    cell_number: Option<String>,
    #[serde(rename = "Ward", default, deserialize_with = "empty_string_as_none")]
    ward_code: Option<String>,
    #[serde(
        rename = "Voting District",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    voting_district_code: Option<String>,
}

impl From<CsvApplicantRow> for RawApplicantRow {
    fn from(row: CsvApplicantRow) -> Self {
        RawApplicantRow {
            first_name: row.first_name,
            surname: row.surname,
            id_number: row.id_number,
            cell_number: row.cell_number,
            ward_code: row.ward_code,
            voting_district_code: row.voting_district_code,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
