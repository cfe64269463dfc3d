//! Tracing setup: stdout plus one timestamped file per launch in the app log dir.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

const KEEP_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "steelscan_";
const DEFAULT_FILTER: &str = "info";

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    LogDir(#[from] app_dirs::AppDirError),
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init() -> Result<(), LoggingError> {
    if FILE_WRITER_GUARD.get().is_some() {
        return Ok(());
    }

    let files = LogFiles::new(app_dirs::logs_dir()?);
    let log_path = files.create_for(now_local_or_utc())?;
    files.prune(KEEP_LOG_FILES)?;

    let file_name = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(files.dir(), file_name));

    let timer = local_timer();
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        )
        .try_init()?;
    let _ = FILE_WRITER_GUARD.set(guard);

    tracing::info!("Writing log to {}", log_path.display());
    Ok(())
}

/// The per-launch log files inside one directory.
struct LogFiles {
    dir: PathBuf,
}

impl LogFiles {
    fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(at: OffsetDateTime) -> Result<String, LoggingError> {
        const STAMP: &[FormatItem<'_>] =
            format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
        Ok(format!("{LOG_FILE_PREFIX}{}.log", at.format(STAMP)?))
    }

    /// Create (or reuse) the file for a launch at `at`.
    fn create_for(&self, at: OffsetDateTime) -> Result<PathBuf, LoggingError> {
        let path = self.dir.join(Self::file_name(at)?);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Io {
                action: "create log file",
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Our log files, oldest first. Timestamped names sort chronologically.
    fn existing(&self) -> Result<Vec<PathBuf>, LoggingError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| LoggingError::Io {
            action: "list",
            path: self.dir.clone(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_launch_log(path))
            .collect();
        files.sort();
        Ok(files)
    }

    fn prune(&self, keep: usize) -> Result<(), LoggingError> {
        let files = self.existing()?;
        let excess = files.len().saturating_sub(keep);
        for path in files.into_iter().take(excess) {
            fs::remove_file(&path).map_err(|source| LoggingError::Io {
                action: "remove old log file",
                path,
                source,
            })?;
        }
        Ok(())
    }
}

fn is_launch_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY.into())
}

/// Current local time, falling back to UTC when the local offset is unknown.
pub(crate) fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000 + seconds).unwrap()
    }

    #[test]
    fn launch_file_is_named_after_its_start_time() {
        let dir = tempdir().unwrap();
        let files = LogFiles::new(dir.path().to_path_buf());
        let path = files.create_for(at(0)).unwrap();
        assert_eq!(path, dir.path().join("steelscan_2023-11-14_22-13-20.log"));
        assert!(path.is_file());
    }

    #[test]
    fn prune_keeps_newest_launches_and_foreign_files() {
        let dir = tempdir().unwrap();
        let files = LogFiles::new(dir.path().to_path_buf());
        let created: Vec<PathBuf> = (0..12).map(|i| files.create_for(at(i * 60)).unwrap()).collect();
        fs::write(dir.path().join("engine.log"), "not ours").unwrap();

        files.prune(10).unwrap();
        assert_eq!(files.existing().unwrap(), created[2..].to_vec());
        assert!(dir.path().join("engine.log").exists());
    }
}
