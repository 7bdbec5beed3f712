//! Reading types and the log line codec for the envmon environment monitor.
//!
//! This crate is shared by the sampling daemon (`envmon-core`), which writes
//! raw sample lines, and the archive reader (`envmon-store`), which parses them
//! back into tables.
//!
//! # Example
//!
//! ```
//! use envmon_types::{Field, Reading, SensorValues};
//!
//! let values = SensorValues::missing()
//!     .with(Field::Temperature, 21.4)
//!     .with(Field::Humidity, 45.0);
//! let reading = Reading::new(1_700_000_000.0, values);
//!
//! let line = reading.to_line();
//! let parsed = Reading::parse_line(&line).unwrap();
//! assert_eq!(parsed.get(Field::Temperature), Some(21.4));
//! assert_eq!(parsed.get(Field::Pm25Env), None);
//! ```

pub mod error;
pub mod line;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use line::{
    COLUMN_COUNT, FILE_EXTENSION, FILE_NAME_FORMAT, HEADER, MISSING_TOKEN, TIMESTAMP_COLUMN,
    header_line, is_header,
};
pub use types::{
    FIELD_COUNT, Field, Reading, SensorValues, datetime_to_timestamp, timestamp_to_datetime,
};
