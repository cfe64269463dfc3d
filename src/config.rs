//! Persisted application settings.
//!
//! Settings live in `config.toml` inside the `.steelscan` directory. A missing
//! file yields defaults; unknown or missing keys fall back per field so older
//! files keep loading.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Aggregate application settings loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub defaults: JobDefaults,
    #[serde(default)]
    pub ui: UiSettings,
}

/// How the external detection engine is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Program that runs the engine scripts (typically a Python interpreter).
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
    #[serde(default = "default_train_script")]
    pub train_script: PathBuf,
    #[serde(default = "default_validate_script")]
    pub validate_script: PathBuf,
    #[serde(default = "default_predict_script")]
    pub predict_script: PathBuf,
    /// Root directory under which predict runs write `<name>/` result folders.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            train_script: default_train_script(),
            validate_script: default_validate_script(),
            predict_script: default_predict_script(),
            project_dir: default_project_dir(),
        }
    }
}

/// Numeric parameters pre-filled into new job requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefaults {
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            image_size: default_image_size(),
            confidence: default_confidence(),
        }
    }
}

/// Presentation-loop cadence and log retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    /// Interval between presentation drains of the log and frame channels.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of entries retained by the on-screen log view.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl UiSettings {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("python")
}

fn default_train_script() -> PathBuf {
    PathBuf::from("train.py")
}

fn default_validate_script() -> PathBuf {
    PathBuf::from("val.py")
}

fn default_predict_script() -> PathBuf {
    PathBuf::from("predict.py")
}

fn default_project_dir() -> PathBuf {
    PathBuf::from("runs").join("detect")
}

fn default_epochs() -> u32 {
    50
}

fn default_batch_size() -> u32 {
    16
}

fn default_image_size() -> u32 {
    640
}

fn default_confidence() -> f32 {
    0.25
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_log_capacity() -> usize {
    2000
}

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved.
    #[error("No usable config directory: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

/// Resolve the configuration file path inside the application directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from the application directory, returning defaults if missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    load_from_path(&config_path()?)
}

/// Load configuration from a specific path, returning defaults if it does not exist.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist configuration to the application directory.
pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    save_to_path(config, &config_path()?)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

/// Write through a sibling temp file and rename so readers never see a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    let tmp_path = dir.join(format!("{file_name}.tmp-{:08x}", rand::random::<u32>()));

    let write_result = std::fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(source) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ConfigError::Write {
            path: tmp_path,
            source,
        });
    }
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        ConfigError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
