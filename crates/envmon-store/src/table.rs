//! Column-oriented table of readings.
//!
//! Missing values are stored as `NaN`, so every column has the same length as
//! the timestamp column.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use envmon_types::{FIELD_COUNT, Field, Reading, SensorValues, TIMESTAMP_COLUMN};

use crate::error::{Error, Result};

/// Readings loaded from the archive or accumulated from live lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    timestamps: Vec<f64>,
    columns: [Vec<f64>; FIELD_COUNT],
}

/// Basic statistics over the present values of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Header name of the column.
    pub field: &'static str,
    /// Rows with a value.
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Table {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps in seconds since the Unix epoch.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Values of one field, `NaN` where missing.
    pub fn column(&self, field: Field) -> &[f64] {
        &self.columns[field.index()]
    }

    /// Append a row of raw values. `NaN` marks a missing value.
    pub fn push_row(&mut self, timestamp: f64, values: [f64; FIELD_COUNT]) {
        self.timestamps.push(timestamp);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    /// Append a reading.
    pub fn push_reading(&mut self, reading: &Reading) {
        let values = Field::ALL.map(|field| reading.get(field).unwrap_or(f64::NAN));
        self.push_row(reading.timestamp, values);
    }

    /// Parse a raw sample line and append it.
    ///
    /// Used to accumulate lines drained from the hand-off buffer, for example
    /// for a live chart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the line is malformed; the table is unchanged.
    pub fn push_line(&mut self, line: &str) -> Result<()> {
        let reading = Reading::parse_line(line)?;
        self.push_reading(&reading);
        Ok(())
    }

    /// The row at `index` as a reading, or `None` past the end.
    pub fn row(&self, index: usize) -> Option<Reading> {
        let timestamp = *self.timestamps.get(index)?;
        let mut values = SensorValues::missing();
        for field in Field::ALL {
            // NaN is turned back into a missing value by `set`.
            values.set(field, Some(self.columns[field.index()][index]));
        }
        Some(Reading::new(timestamp, values))
    }

    /// Iterate over rows as readings.
    pub fn rows(&self) -> impl Iterator<Item = Reading> + '_ {
        (0..self.len()).filter_map(|i| self.row(i))
    }

    /// Append every row of `other`.
    pub fn extend(&mut self, other: Table) {
        self.timestamps.extend(other.timestamps);
        for (column, values) in self.columns.iter_mut().zip(other.columns) {
            column.extend(values);
        }
    }

    /// Keep the rows for which `keep(index)` returns true.
    fn retain_rows(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let kept: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        if kept.len() == self.len() {
            return;
        }
        self.timestamps = kept.iter().map(|&i| self.timestamps[i]).collect();
        for column in &mut self.columns {
            *column = kept.iter().map(|&i| column[i]).collect();
        }
    }

    /// Sort rows by timestamp. Rows with equal timestamps keep their order.
    pub fn sort_by_timestamp(&mut self) {
        if self.timestamps.is_sorted_by(|a, b| a <= b) {
            return;
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.timestamps[a].total_cmp(&self.timestamps[b]));
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for column in &mut self.columns {
            *column = order.iter().map(|&i| column[i]).collect();
        }
    }

    /// Drop rows whose timestamp is `NaN` or infinite.
    pub fn drop_invalid_timestamps(&mut self) {
        let timestamps = self.timestamps.clone();
        self.retain_rows(|i| timestamps[i].is_finite());
    }

    /// Drop rows with any missing value.
    pub fn drop_incomplete(&mut self) {
        let complete: Vec<bool> = (0..self.len())
            .map(|i| self.columns.iter().all(|c| !c[i].is_nan()))
            .collect();
        self.retain_rows(|i| complete[i]);
    }

    /// Keep rows with `since <= timestamp <= until`. `None` leaves that side open.
    pub fn retain_between(&mut self, since: Option<f64>, until: Option<f64>) {
        let timestamps = self.timestamps.clone();
        self.retain_rows(|i| {
            let t = timestamps[i];
            since.is_none_or(|s| t >= s) && until.is_none_or(|u| t <= u)
        });
    }

    /// Turn the cumulative "particles larger than d" counts into per-bin counts.
    ///
    /// Each count becomes the number of particles between its size and the
    /// next larger size; the largest bin is unchanged. Applying this twice is
    /// not meaningful.
    pub fn differential_counts(&mut self) {
        for pair in Field::PARTICLE_COUNTS.windows(2) {
            let (smaller, larger) = (pair[0].index(), pair[1].index());
            for row in 0..self.len() {
                let next = self.columns[larger][row];
                self.columns[smaller][row] -= next;
            }
        }
    }

    /// Average rows into fixed buckets aligned to the Unix epoch.
    ///
    /// Each output row is stamped with the start of its bucket. Missing values
    /// are ignored; a column with no value in a bucket stays missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `bucket` is shorter than a millisecond.
    pub fn resample_mean(&self, bucket: Duration) -> Result<Table> {
        let width = bucket.as_secs_f64();
        if bucket < Duration::from_millis(1) {
            return Err(Error::InvalidArgument(format!(
                "resample bucket must be at least 1ms, got {bucket:?}"
            )));
        }

        #[derive(Default)]
        struct Bucket {
            sums: [f64; FIELD_COUNT],
            counts: [usize; FIELD_COUNT],
        }

        let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
        for row in 0..self.len() {
            if !self.timestamps[row].is_finite() {
                continue;
            }
            let key = (self.timestamps[row] / width).floor() as i64;
            let bucket = buckets.entry(key).or_default();
            for (i, column) in self.columns.iter().enumerate() {
                let value = column[row];
                if !value.is_nan() {
                    bucket.sums[i] += value;
                    bucket.counts[i] += 1;
                }
            }
        }

        let mut resampled = Table::new();
        for (key, bucket) in buckets {
            let mut values = [f64::NAN; FIELD_COUNT];
            for (i, value) in values.iter_mut().enumerate() {
                if bucket.counts[i] > 0 {
                    *value = bucket.sums[i] / bucket.counts[i] as f64;
                }
            }
            resampled.push_row(key as f64 * width, values);
        }
        Ok(resampled)
    }

    /// Min, max and mean of the present values of `field`.
    pub fn summary(&self, field: Field) -> Option<ColumnSummary> {
        let present: Vec<f64> = self
            .column(field)
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if present.is_empty() {
            return None;
        }
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        Some(ColumnSummary {
            field: field.name(),
            count: present.len(),
            min,
            max,
            mean,
        })
    }

    /// Write the table as CSV with a header row. Missing values are empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![TIMESTAMP_COLUMN];
        header.extend(Field::ALL.iter().map(|f| f.name()));
        wtr.write_record(&header)?;

        for row in 0..self.len() {
            let mut record = Vec::with_capacity(FIELD_COUNT + 1);
            record.push(self.timestamps[row].to_string());
            for column in &self.columns {
                let value = column[row];
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write the table as CSV to `path`, replacing any existing file.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(temperature: f64) -> [f64; FIELD_COUNT] {
        let mut values = [1.0; FIELD_COUNT];
        values[Field::Temperature.index()] = temperature;
        values
    }

    #[test]
    fn test_push_line_and_row() {
        let mut table = Table::new();
        let reading = Reading::new(
            100.0,
            SensorValues::missing().with(Field::Humidity, 40.0),
        );
        table.push_line(&reading.to_line()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.column(Field::Temperature)[0].is_nan());
        assert_eq!(table.row(0), Some(reading));
        assert_eq!(table.row(1), None);

        assert!(table.push_line("100.0 1 2\n").is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sort_and_retain() {
        let mut table = Table::new();
        table.push_row(30.0, row(3.0));
        table.push_row(10.0, row(1.0));
        table.push_row(20.0, row(2.0));
        table.sort_by_timestamp();
        assert_eq!(table.timestamps(), [10.0, 20.0, 30.0]);
        assert_eq!(table.column(Field::Temperature), [1.0, 2.0, 3.0]);

        table.retain_between(Some(15.0), None);
        assert_eq!(table.timestamps(), [20.0, 30.0]);
        table.retain_between(None, Some(20.0));
        assert_eq!(table.column(Field::Temperature), [2.0]);
    }

    #[test]
    fn test_drop_incomplete_and_invalid() {
        let mut table = Table::new();
        table.push_row(1.0, row(20.0));
        table.push_row(2.0, row(f64::NAN));
        table.push_row(f64::NAN, row(22.0));
        table.push_row(f64::INFINITY, row(23.0));
        table.push_row(f64::NEG_INFINITY, row(24.0));

        table.drop_invalid_timestamps();
        assert_eq!(table.len(), 2);
        table.drop_incomplete();
        assert_eq!(table.timestamps(), [1.0]);
    }

    #[test]
    fn test_differential_counts() {
        let mut values = [f64::NAN; FIELD_COUNT];
        let cumulative = [510.0, 150.0, 30.0, 4.0, 1.0, 0.0];
        for (field, count) in Field::PARTICLE_COUNTS.iter().zip(cumulative) {
            values[field.index()] = count;
        }
        let mut table = Table::new();
        table.push_row(0.0, values);
        table.differential_counts();

        let bins: Vec<f64> = Field::PARTICLE_COUNTS
            .iter()
            .map(|f| table.column(*f)[0])
            .collect();
        assert_eq!(bins, [360.0, 120.0, 26.0, 3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_resample_mean_ignores_missing() {
        let mut table = Table::new();
        table.push_row(0.0, row(20.0));
        table.push_row(30.0, row(22.0));
        table.push_row(59.0, row(f64::NAN));
        table.push_row(61.0, row(f64::NAN));
        table.push_row(f64::INFINITY, row(99.0));

        let resampled = table.resample_mean(Duration::from_secs(60)).unwrap();
        assert_eq!(resampled.timestamps(), [0.0, 60.0]);
        assert_eq!(resampled.column(Field::Temperature)[0], 21.0);
        assert!(resampled.column(Field::Temperature)[1].is_nan());
        assert_eq!(resampled.column(Field::Humidity), [1.0, 1.0]);

        assert!(table.resample_mean(Duration::ZERO).is_err());
    }

    #[test]
    fn test_summary() {
        let mut table = Table::new();
        table.push_row(0.0, row(18.0));
        table.push_row(1.0, row(f64::NAN));
        table.push_row(2.0, row(22.0));

        let summary = table.summary(Field::Temperature).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.min, 18.0);
        assert_eq!(summary.max, 22.0);
        assert_eq!(summary.mean, 20.0);

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["field"], "temperature");
        assert_eq!(json["count"], 2);

        assert!(Table::new().summary(Field::Temperature).is_none());
    }

    #[test]
    fn test_write_csv() {
        let mut table = Table::new();
        table.push_row(1.5, row(f64::NAN));

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            envmon_types::HEADER.replace(' ', ",")
        );
        assert_eq!(lines.next().unwrap(), "1.5,,1,1,1,1,1,1,1,1,1,1,1,1,1,1");
        assert_eq!(lines.next(), None);
    }
}
