//! Rotating log files.
//!
//! Each sampling cycle writes to its own file named after the cycle start
//! time, `<dir>/<YYYY-MM-DD HH-MM-SS>.txt`. The file is reopened in append
//! mode for every sample and closed again, so a crash between samples always
//! leaves a complete, readable file behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use envmon_types::{FILE_EXTENSION, FILE_NAME_FORMAT, header_line};

use crate::error::{Error, Result};

/// Manages the currently active log file.
#[derive(Debug, Clone)]
pub struct FileRotator {
    dir: PathBuf,
    current: Option<PathBuf>,
}

impl FileRotator {
    /// Create a rotator writing into `dir`. Nothing touches the disk until
    /// [`open_cycle`](Self::open_cycle) is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the active log file, if a cycle has been opened.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// File name for a cycle starting at `started_at`, second resolution.
    pub fn file_name_for<Tz>(started_at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}.{}",
            started_at.format(FILE_NAME_FORMAT),
            FILE_EXTENSION
        )
    }

    /// Start a new log file: create the directory if needed, truncate any
    /// existing file at the derived path and write the header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateLog`] if the directory or the file cannot be written.
    pub async fn open_cycle<Tz>(&mut self, started_at: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| Error::CreateLog {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(Self::file_name_for(started_at));
        fs::write(&path, header_line())
            .await
            .map_err(|source| Error::CreateLog {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Opened log file");
        self.current = Some(path.clone());
        Ok(path)
    }

    /// Append one raw sample line to the active file.
    ///
    /// The file handle only lives for the duration of this call; the write is
    /// flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveLog`] before the first cycle and
    /// [`Error::AppendLog`] if the file cannot be opened or written. The file
    /// is not recreated if it disappeared, since a headerless file would not
    /// be readable by the archive.
    pub async fn append(&self, line: &str) -> Result<()> {
        let path = self.current.as_ref().ok_or(Error::NoActiveLog)?;
        let append_err = |source| Error::AppendLog {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(append_err)?;
        file.write_all(line.as_bytes()).await.map_err(append_err)?;
        file.flush().await.map_err(append_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, Utc};
    use envmon_types::HEADER;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            FileRotator::file_name_for(&at(7, 5, 3)),
            "2024-03-09 07-05-03.txt"
        );
    }

    #[tokio::test]
    async fn test_open_cycle_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut rotator = FileRotator::new(dir.path().join("data"));
        assert!(rotator.current().is_none());

        let path = rotator.open_cycle(&at(12, 0, 0)).await.unwrap();
        assert_eq!(rotator.current(), Some(path.as_path()));
        assert!(path.ends_with("2024-03-09 12-00-00.txt"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{HEADER}\n"));
    }

    #[tokio::test]
    async fn test_open_cycle_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-03-09 12-00-00.txt");
        std::fs::write(&path, "stale contents\nmore\n").unwrap();

        let mut rotator = FileRotator::new(dir.path());
        rotator.open_cycle(&at(12, 0, 0)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(!contents.contains("stale"));
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rotator = FileRotator::new(dir.path());
        let path = rotator.open_cycle(&Local::now()).await.unwrap();

        rotator.append("1 a\n").await.unwrap();
        rotator.append("2 b\n").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![HEADER, "1 a", "2 b"]);
    }

    #[tokio::test]
    async fn test_append_without_cycle_fails() {
        let dir = tempfile::tempdir().unwrap();
        let rotator = FileRotator::new(dir.path());
        assert!(matches!(
            rotator.append("x\n").await,
            Err(Error::NoActiveLog)
        ));
    }

    #[tokio::test]
    async fn test_append_after_file_removed_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut rotator = FileRotator::new(dir.path());
        let path = rotator.open_cycle(&at(1, 2, 3)).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = rotator.append("x\n").await.unwrap_err();
        assert!(matches!(err, Error::AppendLog { .. }));
        assert!(err.is_persistence_failure());
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let mut rotator = FileRotator::new(blocker.join("data"));
        let err = rotator.open_cycle(&at(0, 0, 0)).await.unwrap_err();
        assert!(matches!(err, Error::CreateLog { .. }));
        assert!(rotator.current().is_none());
    }
}
