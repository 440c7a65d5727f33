//! Query parameter validation
//!
//! Turns the raw, untyped query string of an analytics request into a
//! [`FilterSpec`], or a list of field-level problems. Pure: no I/O, no clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{joined_names, Category, FilterSpec, Region, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};

/// Raw query parameters, exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    Missing,
    MalformedDate,
    RangeOrder,
    UnknownEnum,
    MalformedNumber,
    OutOfRange,
    /// The query string could not be decoded at all.
    MalformedRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// Every problem found in one request. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn single(field: &'static str, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self(vec![ValidationError::new(field, kind, message)])
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn has(&self, field: &str, kind: ValidationErrorKind) -> bool {
        self.0.iter().any(|e| e.field == field && e.kind == kind)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate raw query parameters into a [`FilterSpec`].
///
/// Blank optional parameters count as absent. All problems are collected;
/// the range-order check runs only when both dates parsed.
pub fn validate(raw: &RawFilter) -> Result<FilterSpec, ValidationErrors> {
    let mut errors = Vec::new();

    let start_date = required_date("startDate", raw.start_date.as_deref(), &mut errors);
    let end_date = required_date("endDate", raw.end_date.as_deref(), &mut errors);

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            errors.push(ValidationError::new(
                "endDate",
                ValidationErrorKind::RangeOrder,
                "endDate must be greater than or equal to startDate",
            ));
        }
    }

    let region = optional_enum::<Region>("region", raw.region.as_deref(), Region::ALL, &mut errors);
    let category = optional_enum::<Category>(
        "category",
        raw.category.as_deref(),
        Category::ALL,
        &mut errors,
    );
    let limit = parse_limit(raw.limit.as_deref(), &mut errors);

    if !errors.is_empty() {
        return Err(ValidationErrors(errors));
    }

    match (start_date, end_date, limit) {
        (Some(start), Some(end), Some(limit)) => {
            FilterSpec::new(start, end, region, category, limit).ok_or_else(|| {
                ValidationErrors(vec![ValidationError::new(
                    "endDate",
                    ValidationErrorKind::RangeOrder,
                    "endDate must be greater than or equal to startDate",
                )])
            })
        }
        // Each None above already pushed an error.
        _ => Err(ValidationErrors(errors)),
    }
}

/// Parse an ISO-8601 date or date-time as UTC.
///
/// A bare date means midnight UTC of that day. Date-times without an offset
/// are read as UTC.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn required_date(
    field: &'static str,
    value: Option<&str>,
    errors: &mut Vec<ValidationError>,
) -> Option<DateTime<Utc>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        errors.push(ValidationError::new(
            field,
            ValidationErrorKind::Missing,
            format!("{field} is required"),
        ));
        return None;
    };

    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        errors.push(ValidationError::new(
            field,
            ValidationErrorKind::MalformedDate,
            format!("{field} must be a valid ISO 8601 date"),
        ));
    }
    parsed
}

fn optional_enum<T>(
    field: &'static str,
    value: Option<&str>,
    allowed: &[T],
    errors: &mut Vec<ValidationError>,
) -> Option<T>
where
    T: FromStr + fmt::Display,
{
    let value = value.filter(|v| !v.trim().is_empty())?;

    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(ValidationError::new(
                field,
                ValidationErrorKind::UnknownEnum,
                format!("{field} must be one of [{}]", joined_names(allowed)),
            ));
            None
        }
    }
}

fn parse_limit(value: Option<&str>, errors: &mut Vec<ValidationError>) -> Option<usize> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Some(DEFAULT_LIMIT);
    };

    let Ok(limit) = value.parse::<i64>() else {
        errors.push(ValidationError::new(
            "limit",
            ValidationErrorKind::MalformedNumber,
            "limit must be an integer",
        ));
        return None;
    };

    if limit < MIN_LIMIT as i64 || limit > MAX_LIMIT as i64 {
        errors.push(ValidationError::new(
            "limit",
            ValidationErrorKind::OutOfRange,
            format!("limit must be between {MIN_LIMIT} and {MAX_LIMIT}"),
        ));
        return None;
    }

    Some(limit as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(start: &str, end: &str) -> RawFilter {
        RawFilter {
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_filter_gets_defaults() {
        let filter = validate(&raw("2024-01-01", "2024-01-31")).unwrap();
        assert_eq!(
            filter.start_date(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            filter.end_date(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(filter.limit(), DEFAULT_LIMIT);
        assert_eq!(filter.region(), None);
        assert_eq!(filter.category(), None);
    }

    #[test]
    fn test_accepts_full_timestamps() {
        let filter = validate(&raw("2024-01-01T08:30:00Z", "2024-01-01T12:00:00+02:00")).unwrap();
        assert_eq!(
            filter.end_date(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );

        let filter = validate(&raw("2024-01-01T08:30:00.250", "2024-01-02")).unwrap();
        assert_eq!(filter.start_date().timestamp_millis() % 1000, 250);
    }

    #[test]
    fn test_missing_and_malformed_dates() {
        let errors = validate(&RawFilter::default()).unwrap_err();
        assert!(errors.has("startDate", ValidationErrorKind::Missing));
        assert!(errors.has("endDate", ValidationErrorKind::Missing));

        let errors = validate(&raw("yesterday", "2024-13-40")).unwrap_err();
        assert!(errors.has("startDate", ValidationErrorKind::MalformedDate));
        assert!(errors.has("endDate", ValidationErrorKind::MalformedDate));
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_inverted_range() {
        let errors = validate(&raw("2024-02-01", "2024-01-01")).unwrap_err();
        assert!(errors.has("endDate", ValidationErrorKind::RangeOrder));
    }

    #[test]
    fn test_unknown_region_and_category() {
        let mut input = raw("2024-01-01", "2024-01-31");
        input.region = Some("Atlantis".to_string());
        input.category = Some("Toys".to_string());

        let errors = validate(&input).unwrap_err();
        assert!(errors.has("region", ValidationErrorKind::UnknownEnum));
        assert!(errors.has("category", ValidationErrorKind::UnknownEnum));
        assert!(errors.errors()[0].message.contains("North America"));
    }

    #[test]
    fn test_known_enums_parse() {
        let mut input = raw("2024-01-01", "2024-01-31");
        input.region = Some("South America".to_string());
        input.category = Some("Home & Garden".to_string());

        let filter = validate(&input).unwrap();
        assert_eq!(filter.region(), Some(Region::SouthAmerica));
        assert_eq!(filter.category(), Some(Category::HomeAndGarden));
    }

    #[test]
    fn test_blank_optionals_are_absent() {
        let mut input = raw("2024-01-01", "2024-01-31");
        input.region = Some(String::new());
        input.limit = Some("  ".to_string());

        let filter = validate(&input).unwrap();
        assert_eq!(filter.region(), None);
        assert_eq!(filter.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_bounds() {
        for (limit, expected) in [("1", Some(1)), ("100", Some(100)), ("0", None), ("101", None)] {
            let mut input = raw("2024-01-01", "2024-01-31");
            input.limit = Some(limit.to_string());
            match expected {
                Some(n) => assert_eq!(validate(&input).unwrap().limit(), n),
                None => assert!(validate(&input)
                    .unwrap_err()
                    .has("limit", ValidationErrorKind::OutOfRange)),
            }
        }

        let mut input = raw("2024-01-01", "2024-01-31");
        input.limit = Some("2.5".to_string());
        assert!(validate(&input)
            .unwrap_err()
            .has("limit", ValidationErrorKind::MalformedNumber));
    }

    #[test]
    fn test_errors_serialize_as_list() {
        let errors = validate(&raw("2024-02-01", "2024-01-01")).unwrap_err();
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value[0]["field"], "endDate");
        assert_eq!(value[0]["kind"], "rangeOrder");
    }
}
