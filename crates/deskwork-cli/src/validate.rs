use crate::output::CliError;
use chrono::NaiveDate;

pub const MAX_SUBJECT_LEN: usize = 200;
pub const MAX_USER_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(
            format!("invalid {} '{}': {}", self.field, self.value, self.reason),
            self.suggestion.clone(),
            self.code,
        )
    }
}

pub fn validate_subject(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            "subject",
            s,
            "must not be empty",
            "provide a non-empty --subject",
            "invalid_subject",
        ));
    }
    if s.chars().count() > MAX_SUBJECT_LEN {
        return Err(ValidationError::new(
            "subject",
            s,
            format!("must be <= {MAX_SUBJECT_LEN} characters"),
            "shorten the subject",
            "invalid_subject",
        ));
    }
    if s.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "subject",
            s,
            "must not contain control characters",
            "remove control characters from the subject",
            "invalid_subject",
        ));
    }
    Ok(())
}

pub fn validate_user_id(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().count() > MAX_USER_LEN {
        return Err(ValidationError::new(
            "user",
            s,
            format!("must be 1..={MAX_USER_LEN} characters"),
            "use a short login name such as `alice`",
            "invalid_user",
        ));
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::new(
            "user",
            s,
            "must not contain whitespace or control characters",
            "use a login name without spaces",
            "invalid_user",
        ));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date argument.
pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::new(
            field,
            s,
            "must be a date in YYYY-MM-DD form",
            "use a date such as 2026-04-01",
            "invalid_date",
        )
    })
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::new(
            "latitude",
            latitude.to_string(),
            "must be between -90 and 90",
            "pass decimal degrees, e.g. --lat 9.9312",
            "invalid_coordinates",
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::new(
            "longitude",
            longitude.to_string(),
            "must be between -180 and 180",
            "pass decimal degrees, e.g. --lng 76.2673",
            "invalid_coordinates",
        ));
    }
    Ok(())
}
