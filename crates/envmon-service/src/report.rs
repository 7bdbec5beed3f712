//! Plain-text rendering for the command line.

use std::fmt::Write;

use chrono::Local;

use envmon_store::Table;
use envmon_types::{Field, Reading, timestamp_to_datetime};

fn local_time(timestamp: f64) -> String {
    timestamp_to_datetime(timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// One-line summary of a reading: climate values and PM2.5.
pub fn format_reading(reading: &Reading) -> String {
    let value = |field: Field| match (reading.get(field), field.decimals()) {
        (Some(v), Some(d)) => format!("{v:.d$}{}", field.unit()),
        (Some(v), None) => format!("{v}{}", field.unit()),
        (None, _) => "-".to_string(),
    };
    format!(
        "{}  T {}  RH {}  P {}  PM2.5 {}",
        local_time(reading.timestamp),
        value(Field::Temperature),
        value(Field::Humidity),
        value(Field::Pressure),
        value(Field::Pm25Env),
    )
}

/// Per-field statistics for a loaded table.
pub fn format_summary(table: &Table) -> String {
    let mut out = String::new();
    let (Some(first), Some(last)) = (table.timestamps().first(), table.timestamps().last()) else {
        out.push_str("No rows\n");
        return out;
    };

    let _ = writeln!(
        out,
        "{} rows from {} to {}",
        table.len(),
        local_time(*first),
        local_time(*last)
    );
    let _ = writeln!(
        out,
        "{:<16} {:>8} {:>10} {:>10} {:>10}",
        "field", "count", "min", "mean", "max"
    );
    for field in Field::ALL {
        match table.summary(field) {
            Some(s) => {
                let _ = writeln!(
                    out,
                    "{:<16} {:>8} {:>10.1} {:>10.1} {:>10.1}",
                    s.field, s.count, s.min, s.mean, s.max
                );
            }
            None => {
                let _ = writeln!(out, "{:<16} {:>8}", field.name(), 0);
            }
        }
    }
    out
}
