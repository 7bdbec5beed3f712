//! Query builder for archive ranges.
//!
//! # Example
//!
//! ```no_run
//! use envmon_store::{Archive, ArchiveQuery, TimeWindow};
//!
//! let archive = Archive::new("/var/lib/envmon/data");
//!
//! // The last day of complete rows, with per-bin particle counts
//! let query = ArchiveQuery::new()
//!     .window(TimeWindow::OneDay)
//!     .drop_incomplete()
//!     .differential_counts();
//! let table = archive.query(&query)?;
//! println!("{} rows", table.len());
//! # Ok::<(), envmon_store::Error>(())
//! ```

use chrono::{Local, NaiveDateTime, TimeZone};

use envmon_types::datetime_to_timestamp;

use crate::archive::{Archive, LoadOptions, LogFile, TimeWindow};
use crate::error::{Error, Result};
use crate::table::Table;

/// Fluent query builder for [`Archive::query`].
///
/// Without any filter the whole archive is loaded. Times are local, matching
/// the log file names.
#[derive(Debug, Default, Clone)]
pub struct ArchiveQuery {
    /// Keep rows at or after this time.
    pub since: Option<NaiveDateTime>,
    /// Keep rows at or before this time.
    pub until: Option<NaiveDateTime>,
    /// Keep files started within this window of the newest file.
    pub window: Option<TimeWindow>,
    /// Load options.
    pub options: LoadOptions,
}

impl ArchiveQuery {
    /// Create a query with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to rows at or after this time.
    pub fn since(mut self, time: NaiveDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to rows at or before this time.
    pub fn until(mut self, time: NaiveDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Filter to a window measured back from the newest file.
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Drop rows with any missing value.
    pub fn drop_incomplete(mut self) -> Self {
        self.options.drop_incomplete = true;
        self
    }

    /// Convert cumulative particle counts into per-bin counts.
    pub fn differential_counts(mut self) -> Self {
        self.options.differential_counts = true;
        self
    }

    /// Select the files that can hold rows matching this query.
    ///
    /// A file started before `since` is still included when it is the last
    /// one to do so, because its later rows may fall inside the range.
    pub fn select_files(&self, files: Vec<LogFile>) -> Vec<LogFile> {
        let mut files = files;

        if let (Some(window), Some(newest)) = (self.window, files.last().map(|f| f.started_at)) {
            let cutoff = newest - window.duration();
            files.retain(|f| f.started_at >= cutoff);
        }

        if let Some(until) = self.until {
            files.retain(|f| f.started_at <= until);
        }

        if let Some(since) = self.since {
            let first_inside = files.partition_point(|f| f.started_at < since);
            let keep_from = first_inside.saturating_sub(1);
            files.drain(..keep_from);
        }

        files
    }
}

impl Archive {
    /// Load the rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFiles`] if no log file can hold matching rows, and
    /// any error from [`Archive::load`].
    pub fn query(&self, query: &ArchiveQuery) -> Result<Table> {
        let files = query.select_files(self.list_files()?);
        if files.is_empty() {
            return Err(Error::NoFiles);
        }

        let mut table = self.load(&files, &query.options)?;
        if query.since.is_some() || query.until.is_some() {
            table.retain_between(
                query.since.and_then(local_timestamp),
                query.until.and_then(local_timestamp),
            );
        }
        Ok(table)
    }
}

fn local_timestamp(time: NaiveDateTime) -> Option<f64> {
    Local
        .from_local_datetime(&time)
        .earliest()
        .map(|t| datetime_to_timestamp(&t))
}
