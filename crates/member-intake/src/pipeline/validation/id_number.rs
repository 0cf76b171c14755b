use crate::pipeline::domain::ValidationIssue;
use chrono::{Datelike, NaiveDate};

/// Check a South African ID number against the format, birth-date, and
/// checksum rules. Returns the first rule violated, in the fixed order
/// format, month, day, calendar date, future date, checksum.
pub(crate) fn check_id_number(value: &str, today: NaiveDate) -> Result<(), ValidationIssue> {
    let digits: Vec<u32> = value.chars().filter_map(|ch| ch.to_digit(10)).collect();
    if digits.len() != 13 || value.chars().count() != 13 {
        return Err(ValidationIssue::IdFormat);
    }

    let month = digits[2] * 10 + digits[3];
    if !(1..=12).contains(&month) {
        return Err(ValidationIssue::IdMonth { month });
    }

    let day = digits[4] * 10 + digits[5];
    if !(1..=31).contains(&day) {
        return Err(ValidationIssue::IdDay { day });
    }

    let year = infer_year(digits[0] * 10 + digits[1], today);
    let birth_date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(ValidationIssue::IdCalendarDate { year, month, day })?;
    if birth_date > today {
        return Err(ValidationIssue::IdFutureDate { date: birth_date });
    }

    let expected = check_digit(&digits[..12]);
    if expected != digits[12] {
        return Err(ValidationIssue::IdChecksum {
            expected,
            found: digits[12],
        });
    }

    Ok(())
}

/// Two-digit years after the current one belong to the 1900s; the rest to
/// the 2000s. Ambiguity resolves to the date closer to today, preferring
/// the past.
fn infer_year(two_digit_year: u32, today: NaiveDate) -> i32 {
    let current = (today.year() % 100) as u32;
    if two_digit_year > current {
        1900 + two_digit_year as i32
    } else {
        2000 + two_digit_year as i32
    }
}

/// Luhn-style check digit over the first 12 digits: double every second
/// digit from the right, subtract 9 from doubled values over 9, sum, then
/// `(10 - sum % 10) % 10`.
pub(crate) fn check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(position, digit)| {
            if position % 2 == 0 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                *digit
            }
        })
        .sum();
    (10 - sum % 10) % 10
}
