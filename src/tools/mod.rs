//! Meal Tracker Tools module
//!
//! MCP tool implementations. Each tool takes the shared `Database`, does its
//! work on one pooled connection and reports failures as plain strings.

pub mod dashboard;
pub mod foods;
pub mod meals;
pub mod profile;
pub mod reports;
pub mod status;

use chrono::NaiveDate;

use crate::models::DATE_FORMAT;

/// Parse a `YYYY-MM-DD` tool argument
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

/// Parse an optional date, defaulting to the local calendar date
pub(crate) fn date_or_today(value: Option<&str>) -> Result<NaiveDate, String> {
    match value {
        Some(v) => parse_date(v),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-10-18").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
        assert!(parse_date("18/10/2026").unwrap_err().contains("YYYY-MM-DD"));
        assert!(parse_date("2026-02-30").is_err());
    }
}
