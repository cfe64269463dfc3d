//! Where steelscan keeps its config file and launch logs.
//!
//! Everything lives in one `.steelscan` folder under the OS config root, or
//! under `$STEELSCAN_CONFIG_HOME` when that is set.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".steelscan";
pub const CONFIG_HOME_ENV: &str = "STEELSCAN_CONFIG_HOME";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory is available on this system; set STEELSCAN_CONFIG_HOME")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.steelscan` folder, created on first use.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// `.steelscan/logs`, created on first use.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    match std::fs::create_dir_all(&path) {
        Ok(()) => Ok(path),
        Err(source) => Err(AppDirError::CreateDir { path, source }),
    }
}

fn base_dir() -> Option<PathBuf> {
    redirected_base()
        .or_else(|| std::env::var_os(CONFIG_HOME_ENV))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

#[cfg(test)]
fn redirected_base() -> Option<std::ffi::OsString> {
    test_base::current().map(PathBuf::into_os_string)
}

#[cfg(not(test))]
fn redirected_base() -> Option<std::ffi::OsString> {
    None
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn folders_are_created_under_the_redirected_base() {
        let base = tempdir().unwrap();
        let _redirect = test_base::Redirect::to(base.path());

        let root = app_root_dir().unwrap();
        assert_eq!(root, base.path().join(".steelscan"));
        assert_eq!(logs_dir().unwrap(), root.join("logs"));
        assert!(root.join("logs").is_dir());
    }

    #[test]
    fn blocked_root_is_a_create_error() {
        let base = tempdir().unwrap();
        std::fs::write(base.path().join(APP_DIR_NAME), "a file, not a folder").unwrap();
        let _redirect = test_base::Redirect::to(base.path());

        assert!(matches!(app_root_dir(), Err(AppDirError::CreateDir { .. })));
    }
}
