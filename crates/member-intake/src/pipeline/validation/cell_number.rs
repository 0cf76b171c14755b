use crate::pipeline::domain::ValidationIssue;

/// Normalize a raw cell number to the canonical 10-digit local form.
///
/// Accepted shapes after stripping separators: `0XXXXXXXXX`,
/// `27XXXXXXXXX`, and `+27XXXXXXXXX`. Everything else is rejected with a
/// shape issue; the prefix allow-list is checked separately by the
/// validator. Normalization is idempotent: a canonical number maps to
/// itself.
pub(crate) fn normalize_cell_number(raw: &str) -> Result<String, ValidationIssue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationIssue::CellMissing);
    }

    let international = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    let canonical = if international {
        digits
            .strip_prefix("27")
            .filter(|rest| rest.len() == 9)
            .map(|rest| format!("0{rest}"))
    } else if digits.len() == 11 {
        digits
            .strip_prefix("27")
            .map(|rest| format!("0{rest}"))
    } else if digits.len() == 10 && digits.starts_with('0') {
        Some(digits.clone())
    } else {
        None
    };

    canonical.ok_or_else(|| ValidationIssue::CellShape {
        raw: trimmed.to_string(),
    })
}
