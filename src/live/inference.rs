use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

use super::capture::Frame;
use crate::config::EngineSettings;
use crate::detection::{DetectionRecord, ParseError, read_label_file};
use crate::jobs::JobCommand;

const FRAME_FILE: &str = "frame.png";
const RUN_NAME: &str = "live";
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to prepare inference workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("Failed to write frame to {path}: {source}")]
    WriteFrame {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed: {detail}")]
    Engine { command: String, detail: String },
    #[error(transparent)]
    Labels(#[from] ParseError),
}

/// One detection pass over one frame.
pub trait FrameInference: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>, InferenceError>;
}

/// Builds a [`FrameInference`] for a model when a live session starts.
pub trait InferenceProvider: Send + Sync {
    fn load(&self, model: &Path, confidence: f32) -> Result<Box<dyn FrameInference>, InferenceError>;
}

/// Provider backed by the configured engine predict script.
#[derive(Debug, Clone)]
pub struct EngineInferenceProvider {
    engine: EngineSettings,
}

impl EngineInferenceProvider {
    pub fn new(engine: EngineSettings) -> Self {
        Self { engine }
    }
}

impl InferenceProvider for EngineInferenceProvider {
    fn load(&self, model: &Path, confidence: f32) -> Result<Box<dyn FrameInference>, InferenceError> {
        Ok(Box::new(EngineFrameInference::new(
            self.engine.clone(),
            model.to_path_buf(),
            confidence,
        )?))
    }
}

/// Runs the predict script on each frame, saved into a private temp directory.
pub struct EngineFrameInference {
    engine: EngineSettings,
    model: PathBuf,
    confidence: f32,
    workspace: TempDir,
}

impl EngineFrameInference {
    pub fn new(engine: EngineSettings, model: PathBuf, confidence: f32) -> Result<Self, InferenceError> {
        let workspace = tempfile::Builder::new()
            .prefix("steelscan-live-")
            .tempdir()
            .map_err(InferenceError::Workspace)?;
        Ok(Self {
            engine,
            model,
            confidence,
            workspace,
        })
    }

    fn command(&self, frame_path: &Path) -> JobCommand {
        JobCommand::new(self.engine.interpreter.as_os_str())
            .arg(&self.engine.predict_script)
            .flag("--model", &self.model)
            .flag("--source", frame_path)
            .flag("--name", RUN_NAME)
            .arg("--save_txt")
            .flag("--project", self.workspace.path())
            .flag("--conf", self.confidence.to_string())
    }

    fn labels_path(&self) -> PathBuf {
        self.workspace
            .path()
            .join(RUN_NAME)
            .join("labels")
            .join(Path::new(FRAME_FILE).with_extension("txt"))
    }
}

impl FrameInference for EngineFrameInference {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>, InferenceError> {
        let frame_path = self.workspace.path().join(FRAME_FILE);
        frame
            .image
            .save(&frame_path)
            .map_err(|source| InferenceError::WriteFrame {
                path: frame_path.clone(),
                source,
            })?;
        let labels = self.labels_path();
        // The engine reuses the run folder, so a previous frame's labels must not leak through.
        if labels.exists() {
            std::fs::remove_file(&labels).map_err(InferenceError::Workspace)?;
        }

        let command = self.command(&frame_path);
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| InferenceError::Spawn {
                command: command.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(InferenceError::Engine {
                command: command.to_string(),
                detail: failure_detail(&output.status, &output.stderr),
            });
        }

        if !labels.exists() {
            debug!("Frame {} produced no detections", frame.index);
            return Ok(Vec::new());
        }
        Ok(read_label_file(&labels)?.collect())
    }
}

fn failure_detail(status: &std::process::ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ");
    if tail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {tail}")
    }
}
