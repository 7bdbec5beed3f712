//! Archive reader for envmon log files.
//!
//! The sampling daemon writes one plain-text log file per cycle, named after
//! the local time the cycle started. This crate finds those files, selects
//! them by time range or look-back window and loads them into a [`Table`].
//!
//! # Features
//!
//! - List log files by start time, ignoring unrelated files
//! - Select by explicit range or by window (`1h 8h 24h 7d 1m 6m 1y`)
//! - Tolerate a final row cut off by a crash
//! - Per-bin particle counts, fixed-bucket resampling
//! - CSV export
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use envmon_store::{Archive, ArchiveQuery, TimeWindow};
//! use envmon_types::Field;
//!
//! let archive = Archive::new("/var/lib/envmon/data");
//! let table = archive.query(&ArchiveQuery::new().window(TimeWindow::OneWeek))?;
//!
//! let hourly = table.resample_mean(Duration::from_secs(3600))?;
//! if let Some(summary) = hourly.summary(Field::Temperature) {
//!     println!("mean temperature {:.1}", summary.mean);
//! }
//! hourly.export_csv("week.csv".as_ref())?;
//! # Ok::<(), envmon_store::Error>(())
//! ```

mod archive;
mod error;
mod queries;
mod table;

pub use archive::{Archive, LoadOptions, LogFile, TimeWindow};
pub use envmon_types::{FILE_EXTENSION, FILE_NAME_FORMAT};
pub use error::{Error, Result};
pub use queries::ArchiveQuery;
pub use table::{ColumnSummary, Table};
