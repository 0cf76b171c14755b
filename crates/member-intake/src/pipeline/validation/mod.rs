mod cell_number;
mod id_number;

use crate::config::PipelineConfig;
use crate::pipeline::directory::GeoLookup;
use crate::pipeline::domain::{
    ApplicantRecord, RawApplicantRow, ValidationIssue, ValidationOutcome,
};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;

/// Pure validator for one applicant row.
///
/// Total over all input: malformed rows come back as
/// [`ValidationOutcome::Invalid`] with every violated rule listed in field
/// order (names, ID number, cell number, ward, voting district). Geographic
/// plausibility is delegated to the supplied [`GeoLookup`].
pub struct RecordValidator {
    mobile_prefixes: HashSet<String>,
    reference_date: Option<NaiveDate>,
}

impl RecordValidator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            mobile_prefixes: config.mobile_prefixes.iter().cloned().collect(),
            reference_date: None,
        }
    }

    /// Pin the date used for century inference and future-date checks.
    /// Without this the validator uses the current UTC date per call.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn validate(&self, row: &RawApplicantRow, geo: &dyn GeoLookup) -> ValidationOutcome {
        let today = self
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut issues = Vec::new();

        let first_name = required_text(&row.first_name, "first_name", &mut issues);
        let surname = required_text(&row.surname, "surname", &mut issues);

        let id_number = row.id_number.as_deref().unwrap_or("").trim().to_string();
        if let Err(issue) = id_number::check_id_number(&id_number, today) {
            issues.push(issue);
        }

        let cell_number = match cell_number::normalize_cell_number(
            row.cell_number.as_deref().unwrap_or(""),
        ) {
            Ok(canonical) => {
                let prefix = &canonical[..3];
                if !self.mobile_prefixes.contains(prefix) {
                    issues.push(ValidationIssue::CellPrefix {
                        prefix: prefix.to_string(),
                    });
                }
                canonical
            }
            Err(issue) => {
                issues.push(issue);
                String::new()
            }
        };

        let ward_code = match row.ward_code.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(ValidationIssue::WardMissing);
                String::new()
            }
            Some(code) if !geo.is_valid_ward_code(code) => {
                issues.push(ValidationIssue::WardUnknown {
                    code: code.to_string(),
                });
                code.to_string()
            }
            Some(code) => code.to_string(),
        };

        let voting_district_code = match row.voting_district_code.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(ValidationIssue::VotingDistrictMissing);
                String::new()
            }
            Some(code) if !geo.is_valid_voting_district_code(code) => {
                issues.push(ValidationIssue::VotingDistrictUnknown {
                    code: code.to_string(),
                });
                code.to_string()
            }
            Some(code) => code.to_string(),
        };

        if issues.is_empty() {
            ValidationOutcome::Valid(ApplicantRecord {
                first_name,
                surname,
                id_number,
                cell_number,
                ward_code,
                voting_district_code,
            })
        } else {
            ValidationOutcome::Invalid(issues)
        }
    }
}

fn required_text(
    value: &Option<String>,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> String {
    match value.as_deref().map(str::trim) {
        None | Some("") => {
            issues.push(ValidationIssue::MissingField {
                field: field.to_string(),
            });
            String::new()
        }
        Some(text) => text.to_string(),
    }
}
