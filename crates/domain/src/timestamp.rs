//! Parsing and formatting of wire timestamps.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{DomainError, Result};

/// Format of every timestamp written by the services.
pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of membership validity dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a timestamp in any accepted input format.
///
/// `field` names the offending field in the validation message.
pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| DomainError::validation(format!("Invalid {field} format: {value:?}")))
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| DomainError::validation(format!("Invalid {field} format: {value:?}")))
}

/// Formats a timestamp in the output format.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(OUTPUT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_all_input_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();

        for input in [
            "2025-06-01T09:30",
            "2025-06-01T09:30:00",
            "2025-06-01 09:30:00",
            "2025-06-01 09:30",
        ] {
            assert_eq!(parse_timestamp("start", input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_rejects_malformed_timestamps() {
        assert!(parse_timestamp("start", "").is_err());
        assert!(parse_timestamp("start", "2025-06-01").is_err());
        assert!(parse_timestamp("start", "01/06/2025 09:30").is_err());

        let err = parse_timestamp("end_date", "tomorrow").unwrap_err();
        assert!(err.to_string().contains("end_date"));
    }

    #[test]
    fn test_output_format() {
        let ts = parse_timestamp("start", "2025-06-01T09:30").unwrap();
        assert_eq!(format_timestamp(&ts), "2025-06-01 09:30:00");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("start_date", "2025-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        assert!(parse_date("start_date", "2025-02-30").is_err());
    }
}
