//! Cell parsing helpers and heuristic type inference for raw columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexSet;

use crate::input::DataTable;
use crate::schema::FieldType;

/// Date layouts accepted for date cells, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d.%m.%Y"];

/// Date-time layouts; `%.f` also matches an absent fraction.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

pub(crate) const DATE_OUTPUT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_OUTPUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Distinct-value ceiling for an inferred categorical column.
const CATEGORICAL_MAX_DISTINCT: usize = 10;

/// Parse a finite number; `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a cell that carries an explicit time of day.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parse a calendar date; date-time cells yield their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_timestamp(trimmed).map(|dt| dt.date()))
}

/// Parse a date-time; plain dates are taken at midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    parse_timestamp(raw).or_else(|| {
        let trimmed = raw.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .map(|date| date.and_time(NaiveTime::MIN))
    })
}

/// Distinct non-missing values in first-seen order.
pub fn distinct_values<'a>(values: &[&'a str]) -> IndexSet<&'a str> {
    values
        .iter()
        .copied()
        .filter(|v| !DataTable::is_null_value(v))
        .map(str::trim)
        .collect()
}

/// Guess a column's type from its values.
///
/// Numeric columns are integer when every value is whole, otherwise decimal.
/// Then dates, then two distinct values (binary), up to ten (categorical),
/// and text for everything else, including empty columns.
pub fn infer_type(values: &[&str]) -> FieldType {
    let present: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !DataTable::is_null_value(v))
        .collect();
    if present.is_empty() {
        return FieldType::Text;
    }

    let numbers: Option<Vec<f64>> = present.iter().map(|v| parse_number(v)).collect();
    if let Some(numbers) = numbers {
        return if numbers.iter().all(|n| n.fract() == 0.0) {
            FieldType::Integer
        } else {
            FieldType::Decimal
        };
    }

    if present.iter().all(|v| parse_date(v).is_some()) {
        return if present.iter().any(|v| parse_timestamp(v).is_some()) {
            FieldType::DateTime
        } else {
            FieldType::Date
        };
    }

    match distinct_values(&present).len() {
        2 => FieldType::Binary,
        n if n <= CATEGORICAL_MAX_DISTINCT => FieldType::Categorical,
        _ => FieldType::Text,
    }
}
