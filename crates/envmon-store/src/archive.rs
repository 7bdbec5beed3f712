//! Log file discovery and loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::{debug, warn};

use envmon_types::{
    COLUMN_COUNT, FIELD_COUNT, FILE_EXTENSION, FILE_NAME_FORMAT, is_header, line::parse_value,
};

use crate::error::{Error, Result};
use crate::table::Table;

/// A log file and the local time its cycle started, taken from its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LogFile {
    /// Cycle start in local time, second resolution.
    pub started_at: NaiveDateTime,
    /// Full path of the file.
    pub path: PathBuf,
}

impl LogFile {
    /// Recognize a log file by its name. Returns `None` for anything else.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        if path.extension()? != FILE_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let started_at = NaiveDateTime::parse_from_str(stem, FILE_NAME_FORMAT).ok()?;
        Some(Self { started_at, path })
    }
}

/// Named look-back windows, measured back from the newest log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeWindow {
    OneHour,
    EightHours,
    OneDay,
    OneWeek,
    /// 30 days.
    OneMonth,
    /// 180 days.
    SixMonths,
    /// 365 days.
    OneYear,
}

impl TimeWindow {
    /// All windows from shortest to longest.
    pub const ALL: [TimeWindow; 7] = [
        TimeWindow::OneHour,
        TimeWindow::EightHours,
        TimeWindow::OneDay,
        TimeWindow::OneWeek,
        TimeWindow::OneMonth,
        TimeWindow::SixMonths,
        TimeWindow::OneYear,
    ];

    /// Short name as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            TimeWindow::OneHour => "1h",
            TimeWindow::EightHours => "8h",
            TimeWindow::OneDay => "24h",
            TimeWindow::OneWeek => "7d",
            TimeWindow::OneMonth => "1m",
            TimeWindow::SixMonths => "6m",
            TimeWindow::OneYear => "1y",
        }
    }

    /// Length of the window.
    pub fn duration(self) -> TimeDelta {
        match self {
            TimeWindow::OneHour => TimeDelta::hours(1),
            TimeWindow::EightHours => TimeDelta::hours(8),
            TimeWindow::OneDay => TimeDelta::hours(24),
            TimeWindow::OneWeek => TimeDelta::days(7),
            TimeWindow::OneMonth => TimeDelta::days(30),
            TimeWindow::SixMonths => TimeDelta::days(180),
            TimeWindow::OneYear => TimeDelta::days(365),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidWindow(s.to_string()))
    }
}

/// Post-processing applied by [`Archive::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Drop rows with any missing value.
    pub drop_incomplete: bool,
    /// Convert cumulative particle counts into per-bin counts.
    pub differential_counts: bool,
}

/// A directory of log files.
#[derive(Debug, Clone)]
pub struct Archive {
    dir: PathBuf,
}

impl Archive {
    /// Open the archive at `dir`. Nothing is read until files are listed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Archive directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every log file in the directory, oldest first.
    ///
    /// Files whose names do not follow the log file pattern are ignored.
    pub fn list_files(&self) -> Result<Vec<LogFile>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DirectoryNotFound(self.dir.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match LogFile::from_path(entry.path()) {
                Some(file) => files.push(file),
                None => debug!("Skipping non-log file {}", entry.path().display()),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Log files started between `start` and `end`, both inclusive.
    pub fn files_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<LogFile>> {
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|f| f.started_at >= start && f.started_at <= end)
            .collect())
    }

    /// Log files started within `window` of the newest file.
    pub fn files_within(&self, window: TimeWindow) -> Result<Vec<LogFile>> {
        let files = self.list_files()?;
        let Some(newest) = files.last().map(|f| f.started_at) else {
            return Ok(files);
        };
        let cutoff = newest - window.duration();
        Ok(files.into_iter().filter(|f| f.started_at >= cutoff).collect())
    }

    /// Load `files` into one table sorted by timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderMismatch`] if a non-empty file does not start
    /// with the header, and [`Error::MalformedRow`] for a row with the wrong
    /// column count anywhere but an unterminated final line.
    pub fn load(&self, files: &[LogFile], options: &LoadOptions) -> Result<Table> {
        let mut table = Table::new();
        for file in files {
            table.extend(load_file(&file.path)?);
        }

        table.drop_invalid_timestamps();
        if options.drop_incomplete {
            table.drop_incomplete();
        }
        if options.differential_counts {
            table.differential_counts();
        }
        table.sort_by_timestamp();

        debug!("Loaded {} rows from {} files", table.len(), files.len());
        Ok(table)
    }
}

/// Parse one log file. Unparseable or non-finite values, including the
/// timestamp, become `NaN`.
fn load_file(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    let mut table = Table::new();

    let mut lines = content.lines().enumerate();
    match lines.next() {
        None => {
            warn!("Skipping empty log file {}", path.display());
            return Ok(table);
        }
        Some((_, header)) if is_header(header) => {}
        Some(_) => {
            return Err(Error::HeaderMismatch {
                path: path.to_path_buf(),
            });
        }
    }

    let terminated = content.ends_with('\n');
    let last_index = content.lines().count().saturating_sub(1);

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != COLUMN_COUNT {
            if index == last_index && !terminated {
                warn!(
                    "Skipping truncated final row in {} ({} columns)",
                    path.display(),
                    tokens.len()
                );
                continue;
            }
            return Err(Error::MalformedRow {
                path: path.to_path_buf(),
                line: index + 1,
                expected: COLUMN_COUNT,
                actual: tokens.len(),
            });
        }

        let timestamp = tokens[0]
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .unwrap_or(f64::NAN);
        let mut values = [f64::NAN; FIELD_COUNT];
        for (value, token) in values.iter_mut().zip(&tokens[1..]) {
            *value = parse_value(token).unwrap_or(f64::NAN);
        }
        table.push_row(timestamp, values);
    }

    Ok(table)
}
