use crate::pipeline::domain::{
    DuplicateKind, OutcomeCategory, RowOutcome, RowResult, UploadJobId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured outcome report for one upload.
///
/// Deterministic: sections always appear in the order valid, duplicate,
/// invalid, failed, and rows within a section keep their original file
/// order. Serializers downstream (spreadsheet, CSV, JSON) must preserve
/// both orderings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    pub job_id: UploadJobId,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl UploadReport {
    /// Sections are built for every category, present even when empty.
    pub fn section(&self, category: OutcomeCategory) -> Option<&ReportSection> {
        self.sections
            .iter()
            .find(|section| section.category == category)
    }

    pub fn total_rows(&self) -> u64 {
        self.sections
            .iter()
            .map(|section| section.rows.len() as u64)
            .sum()
    }
}

/// All rows that landed in one outcome category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub category: OutcomeCategory,
    pub rows: Vec<ReportRow>,
}

/// One row of a report section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    /// 1-based position in the uploaded file.
    pub row: u64,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub id_number: Option<String>,
    pub cell_number: Option<String>,
    /// Every reason the row failed, in rule order. Empty for valid rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// For within-file duplicates, the row holding the first occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_row: Option<u64>,
}

/// Render the categorized rows of a finished (or aborted) job into a
/// report.
pub fn build_report(job_id: UploadJobId, rows: &[RowResult]) -> UploadReport {
    let sections = OutcomeCategory::REPORT_ORDER
        .iter()
        .map(|category| ReportSection {
            category: *category,
            rows: rows
                .iter()
                .filter(|result| result.outcome.category() == *category)
                .map(report_row)
                .collect(),
        })
        .collect();

    UploadReport {
        job_id,
        generated_at: Utc::now(),
        sections,
    }
}

fn report_row(result: &RowResult) -> ReportRow {
    let (reasons, conflicting_row) = match &result.outcome {
        RowOutcome::Valid(_) => (Vec::new(), None),
        RowOutcome::Invalid { issues } => {
            (issues.iter().map(|issue| issue.to_string()).collect(), None)
        }
        RowOutcome::Duplicate(DuplicateKind::WithinFile { first_row }) => (
            vec![format!("ID number already appears at row {first_row}")],
            Some(*first_row),
        ),
        RowOutcome::Duplicate(DuplicateKind::AlreadyRegistered) => {
            (vec!["ID number is already registered".to_string()], None)
        }
        RowOutcome::Failed { cause } => (vec![cause.clone()], None),
    };

    ReportRow {
        row: result.row,
        first_name: result.raw.first_name.clone(),
        surname: result.raw.surname.clone(),
        id_number: result.raw.id_number.clone(),
        cell_number: result.raw.cell_number.clone(),
        reasons,
        conflicting_row,
    }
}
