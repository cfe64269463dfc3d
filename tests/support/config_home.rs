use std::ffi::OsString;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use steelscan::app_dirs::CONFIG_HOME_ENV;
use tempfile::TempDir;

// Every test binary shares one process environment.
static ENV: Mutex<()> = Mutex::new(());

/// A throwaway config home exported through `STEELSCAN_CONFIG_HOME`.
///
/// The previous value comes back and the directory is deleted on drop.
pub struct TempConfigHome {
    dir: TempDir,
    previous: Option<OsString>,
    _env: MutexGuard<'static, ()>,
}

impl TempConfigHome {
    pub fn new() -> Self {
        let env = ENV.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = tempfile::tempdir().expect("create temp config home");
        let previous = std::env::var_os(CONFIG_HOME_ENV);
        // SAFETY: all environment writes in tests hold `ENV`.
        unsafe { std::env::set_var(CONFIG_HOME_ENV, dir.path()) };
        Self {
            dir,
            previous,
            _env: env,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TempConfigHome {
    fn drop(&mut self) {
        // SAFETY: `ENV` is still held by this guard.
        unsafe {
            match self.previous.take() {
                Some(value) => std::env::set_var(CONFIG_HOME_ENV, value),
                None => std::env::remove_var(CONFIG_HOME_ENV),
            }
        }
    }
}
