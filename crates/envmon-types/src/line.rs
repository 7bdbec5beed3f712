//! Raw sample line codec.
//!
//! A log file is one header line followed by one line per sample. Each line
//! holds space separated tokens in header order and ends with `\n`:
//!
//! ```text
//! timestamp temperature humidity pressure pm10_standard ... particles_100um
//! 1700000000.123 21.4 45.2 1013.2 3 5 6 3 5 6 510 150 30 4 1 0
//! 1700000005.124 21.4 45.1 1013.2 None None None None None None None None None None None None
//! ```
//!
//! Missing values are written as `None`. When parsing, any value token that is
//! not a finite number is read back as missing; only the timestamp must parse.

use core::fmt;
use core::str::FromStr;

use crate::error::{ParseError, ParseResult};
use crate::types::{FIELD_COUNT, Field, Reading, SensorValues};

/// `strftime` pattern of log file stems: the local time the cycle started.
pub const FILE_NAME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Extension of log files.
pub const FILE_EXTENSION: &str = "txt";

/// Name of the first header column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Token written for a missing value.
pub const MISSING_TOKEN: &str = "None";

/// Number of tokens on every line, timestamp included.
pub const COLUMN_COUNT: usize = FIELD_COUNT + 1;

/// Log file header, without the trailing newline.
pub const HEADER: &str = "timestamp temperature humidity pressure pm10_standard pm25_standard pm100_standard pm10_env pm25_env pm100_env particles_03um particles_05um particles_10um particles_25um particles_50um particles_100um";

/// The header line as written to a fresh log file.
#[must_use]
pub fn header_line() -> String {
    format!("{HEADER}\n")
}

/// Check that a line names exactly the expected columns in order.
///
/// Surrounding whitespace and the line terminator are ignored.
#[must_use]
pub fn is_header(line: &str) -> bool {
    line.split_whitespace().eq(HEADER.split(' '))
}

impl Reading {
    /// Serialize to a raw sample line, including the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }

    /// Parse a raw sample line.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FieldCount`] if the line does not have
    /// [`COLUMN_COUNT`] tokens and [`ParseError::InvalidTimestamp`] if the
    /// first token is not a finite number. Unparseable value tokens are not
    /// errors; they become missing values.
    pub fn parse_line(line: &str) -> ParseResult<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != COLUMN_COUNT {
            return Err(ParseError::FieldCount {
                expected: COLUMN_COUNT,
                actual: tokens.len(),
            });
        }

        let timestamp = tokens[0]
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(|| ParseError::InvalidTimestamp(tokens[0].to_string()))?;

        let mut values = SensorValues::missing();
        for (field, token) in Field::ALL.into_iter().zip(&tokens[1..]) {
            values.set(field, parse_value(token));
        }

        Ok(Reading::new(timestamp, values))
    }
}

/// Parse a single value token; anything but a finite number is missing.
#[must_use]
pub fn parse_value(token: &str) -> Option<f64> {
    if token == MISSING_TOKEN {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn write_value(f: &mut fmt::Formatter<'_>, field: Field, value: Option<f64>) -> fmt::Result {
    match (value, field.decimals()) {
        (None, _) => f.write_str(MISSING_TOKEN),
        (Some(v), Some(decimals)) => write!(f, "{v:.decimals$}"),
        (Some(v), None) => write!(f, "{v}"),
    }
}

/// Formats the line without its terminator.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp)?;
        for (field, value) in self.values.iter() {
            f.write_str(" ")?;
            write_value(f, field, value)?;
        }
        Ok(())
    }
}

impl FromStr for Reading {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_reading() -> Reading {
        let mut values = SensorValues::missing();
        let samples = [
            21.37, 45.24, 1013.21, 3.0, 5.0, 6.0, 3.0, 5.0, 6.0, 510.0, 150.0, 30.0, 4.0, 1.0, 0.0,
        ];
        for (field, v) in Field::ALL.into_iter().zip(samples) {
            values.set(field, Some(v));
        }
        Reading::new(1_700_000_000.123_456, values)
    }

    #[test]
    fn test_header_has_column_count_tokens() {
        assert_eq!(HEADER.split(' ').count(), COLUMN_COUNT);
        assert_eq!(HEADER.split(' ').next(), Some(TIMESTAMP_COLUMN));
        for (name, field) in HEADER.split(' ').skip(1).zip(Field::ALL) {
            assert_eq!(name, field.name());
        }
    }

    #[test]
    fn test_file_name_format_round_trips() {
        let started = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 3)
            .unwrap();
        let stem = started.format(FILE_NAME_FORMAT).to_string();
        assert_eq!(format!("{stem}.{FILE_EXTENSION}"), "2024-03-09 07-05-03.txt");
        assert_eq!(
            chrono::NaiveDateTime::parse_from_str(&stem, FILE_NAME_FORMAT).unwrap(),
            started
        );
    }

    #[test]
    fn test_is_header() {
        assert!(is_header(&header_line()));
        assert!(is_header(&format!("{HEADER} \n")));
        assert!(!is_header("timestamp temperature humidity"));
        assert!(!is_header(&HEADER.replace("pressure", "co2")));
    }

    #[test]
    fn test_to_line_format() {
        let line = full_reading().to_line();
        assert_eq!(
            line,
            "1700000000.123456 21.4 45.2 1013.2 3 5 6 3 5 6 510 150 30 4 1 0\n"
        );
    }

    #[test]
    fn test_missing_values_written_as_none() {
        let line = Reading::missing(1_700_000_005.0).to_line();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(tokens.len(), COLUMN_COUNT);
        assert_eq!(tokens[0], "1700000005");
        assert!(tokens[1..].iter().all(|t| *t == MISSING_TOKEN));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_parse_round_trip() {
        let reading = full_reading();
        let parsed = Reading::parse_line(&reading.to_line()).unwrap();
        assert_eq!(parsed.timestamp, reading.timestamp);
        for field in Field::ALL {
            let (a, b) = (parsed.get(field).unwrap(), reading.get(field).unwrap());
            match field.decimals() {
                Some(_) => assert!((a - b).abs() <= 0.05, "{field}: {a} vs {b}"),
                None => assert_eq!(a, b, "{field}"),
            }
        }
    }

    #[test]
    fn test_parse_field_count_mismatch() {
        let result = Reading::parse_line("1700000000.0 21.4 45.2");
        assert_eq!(
            result,
            Err(ParseError::FieldCount {
                expected: COLUMN_COUNT,
                actual: 3
            })
        );

        let too_long = format!("{} 7", full_reading());
        assert!(matches!(
            Reading::parse_line(&too_long),
            Err(ParseError::FieldCount { actual: 17, .. })
        ));

        assert!(matches!(
            Reading::parse_line(""),
            Err(ParseError::FieldCount { actual: 0, .. })
        ));
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        let line = full_reading().to_line().replacen("1700000000.123456", "yesterday", 1);
        assert_eq!(
            Reading::parse_line(&line),
            Err(ParseError::InvalidTimestamp("yesterday".to_string()))
        );

        let nan = full_reading().to_line().replacen("1700000000.123456", "nan", 1);
        assert!(matches!(
            Reading::parse_line(&nan),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_unparseable_value_is_missing() {
        let line = full_reading().to_line().replacen(" 21.4 ", " warm ", 1);
        let parsed = Reading::parse_line(&line).unwrap();
        assert_eq!(parsed.get(Field::Temperature), None);
        assert_eq!(parsed.get(Field::Humidity), Some(45.2));
    }

    #[test]
    fn test_parse_tolerates_trailing_space() {
        // Older archives end each line with a space before the newline.
        let line = format!("{} \n", full_reading());
        assert!(Reading::parse_line(&line).is_ok());
    }

    #[test]
    fn test_from_str() {
        let reading: Reading = Reading::missing(12.5).to_string().parse().unwrap();
        assert_eq!(reading, Reading::missing(12.5));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("None"), None);
        assert_eq!(parse_value("nan"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("12"), Some(12.0));
        assert_eq!(parse_value("-3.5"), Some(-3.5));
    }
}
