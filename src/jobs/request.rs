use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description};

use crate::config::{EngineSettings, JobDefaults};
use crate::logging::now_local_or_utc;

const RUN_NAME_FORMAT: &[FormatItem<'static>] = format_description!("[hour][minute][second]");

/// The external jobs the front-end knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Train,
    Validate,
    /// Single-image prediction with a saved, annotated result image.
    Predict,
    /// Directory prediction that also writes per-image label files.
    BatchPredict,
}

impl JobKind {
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Train => "training",
            JobKind::Validate => "validation",
            JobKind::Predict => "prediction",
            JobKind::BatchPredict => "batch prediction",
        }
    }

    fn run_prefix(self) -> Option<&'static str> {
        match self {
            JobKind::Predict => Some("single"),
            JobKind::BatchPredict => Some("batch"),
            JobKind::Train | JobKind::Validate => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters of one job, filled from the request form.
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    /// Model weights (`.pt`).
    pub model: PathBuf,
    /// Dataset config for train/validate; image or image directory for predictions.
    pub input: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
    pub image_size: u32,
    pub confidence: f32,
    /// Result folder name for predictions; generated from the clock when unset.
    pub run_name: Option<String>,
}

impl JobParams {
    pub fn from_defaults(defaults: &JobDefaults) -> Self {
        Self {
            model: PathBuf::new(),
            input: PathBuf::new(),
            epochs: defaults.epochs,
            batch_size: defaults.batch_size,
            image_size: defaults.image_size,
            confidence: defaults.confidence,
            run_name: None,
        }
    }
}

/// A request is rejected before anything is launched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Select a model file for {0}")]
    MissingModel(JobKind),
    #[error("Select the {what} for {kind}")]
    MissingInput { kind: JobKind, what: &'static str },
    #[error("{field} must be at least 1")]
    NonPositive { field: &'static str },
    #[error("Confidence threshold {0} is outside [0, 1]")]
    Confidence(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub kind: JobKind,
    pub params: JobParams,
}

/// Argument vector of an external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl JobCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn flag(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(name).arg(value)
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// A validated request, ready to launch.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedJob {
    pub kind: JobKind,
    pub command: JobCommand,
    /// `<project>/<run name>` for predictions.
    pub output_dir: Option<PathBuf>,
}

impl PreparedJob {
    /// Directory of per-image label files written by a prediction run.
    pub fn labels_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| dir.join("labels"))
    }
}

impl JobRequest {
    pub fn new(kind: JobKind, params: JobParams) -> Self {
        Self { kind, params }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let params = &self.params;
        if is_blank(&params.model) {
            return Err(RequestError::MissingModel(self.kind));
        }
        if is_blank(&params.input) {
            let what = match self.kind {
                JobKind::Train | JobKind::Validate => "dataset config",
                JobKind::Predict => "image",
                JobKind::BatchPredict => "image directory",
            };
            return Err(RequestError::MissingInput {
                kind: self.kind,
                what,
            });
        }
        if self.kind == JobKind::Train {
            for (field, value) in [
                ("Epochs", params.epochs),
                ("Batch size", params.batch_size),
                ("Image size", params.image_size),
            ] {
                if value == 0 {
                    return Err(RequestError::NonPositive { field });
                }
            }
        }
        if matches!(self.kind, JobKind::Predict | JobKind::BatchPredict)
            && !(0.0..=1.0).contains(&params.confidence)
        {
            return Err(RequestError::Confidence(params.confidence));
        }
        Ok(())
    }

    /// Validate and build the engine command line for this request.
    pub fn prepare(&self, engine: &EngineSettings) -> Result<PreparedJob, RequestError> {
        self.validate()?;
        let params = &self.params;
        let base = JobCommand::new(engine.interpreter.as_os_str());
        let (command, output_dir) = match self.kind {
            JobKind::Train => (
                base.arg(&engine.train_script)
                    .flag("--model", &params.model)
                    .flag("--data", &params.input)
                    .flag("--epochs", params.epochs.to_string())
                    .flag("--batch", params.batch_size.to_string())
                    .flag("--imgsz", params.image_size.to_string()),
                None,
            ),
            JobKind::Validate => (
                base.arg(&engine.validate_script)
                    .flag("--model", &params.model)
                    .flag("--data", &params.input),
                None,
            ),
            JobKind::Predict | JobKind::BatchPredict => {
                let name = self.run_name();
                let mut command = base
                    .arg(&engine.predict_script)
                    .flag("--model", &params.model)
                    .flag("--source", &params.input)
                    .flag("--name", &name)
                    .arg("--save");
                if self.kind == JobKind::BatchPredict {
                    command = command.arg("--save_txt");
                }
                command = command
                    .flag("--project", &engine.project_dir)
                    .flag("--conf", params.confidence.to_string());
                (command, Some(engine.project_dir.join(&name)))
            }
        };
        Ok(PreparedJob {
            kind: self.kind,
            command,
            output_dir,
        })
    }

    fn run_name(&self) -> String {
        if let Some(name) = self.params.run_name.as_ref().filter(|name| !name.is_empty()) {
            return name.clone();
        }
        let prefix = self.kind.run_prefix().unwrap_or("run");
        let stamp = now_local_or_utc()
            .format(RUN_NAME_FORMAT)
            .unwrap_or_else(|_| "000000".to_string());
        format!("{prefix}_{stamp}")
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}
