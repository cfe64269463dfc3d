use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

#[cfg(feature = "camera")]
mod video;

#[cfg(feature = "camera")]
pub use video::VideoBackend;

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Where live frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Camera device index.
    Device(u32),
    /// Video file, still-frame directory or stream address.
    Path(PathBuf),
}

impl CaptureSource {
    /// A string of ASCII digits selects a camera device; anything else is a path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = trimmed.parse() {
                return CaptureSource::Device(index);
            }
        }
        CaptureSource::Path(PathBuf::from(trimmed))
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Device(index) => write!(f, "camera {index}"),
            CaptureSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One captured frame, numbered from zero in capture order.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbaImage,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No capture backend in this build can open {0}")]
    Unsupported(CaptureSource),
    #[error("Failed to open capture source {0}")]
    NotOpened(CaptureSource),
    #[error("Capture source not found: {path}")]
    NotFound { path: PathBuf },
    #[error("Capture source {path} contains no frames")]
    Empty { path: PathBuf },
    #[error("Failed to open capture source {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read frame {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Frame from {capture} has an unexpected pixel layout")]
    FrameLayout { capture: CaptureSource },
    #[cfg(feature = "camera")]
    #[error("Video capture failed on {capture}: {source}")]
    Video {
        capture: CaptureSource,
        source: opencv::Error,
    },
}

/// An opened source. `Ok(None)` means the source is exhausted.
pub trait FrameReader: Send {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Opens capture sources; called once per live session on the caller's thread.
pub trait CaptureBackend: Send + Sync {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError>;
}

/// Still-frame directories and image files go to [`StillFrameBackend`];
/// cameras, video files and stream addresses go to the video backend when the
/// crate is built with the `camera` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCaptureBackend;

impl CaptureBackend for DefaultCaptureBackend {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError> {
        match source {
            CaptureSource::Path(path) if path.is_dir() || is_frame_file(path) => {
                StillFrameBackend.open(source)
            }
            _ => open_video(source),
        }
    }
}

#[cfg(feature = "camera")]
fn open_video(source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError> {
    VideoBackend.open(source)
}

#[cfg(not(feature = "camera"))]
fn open_video(source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError> {
    Err(CaptureError::Unsupported(source.clone()))
}

/// Reads a single image, or every image directly inside a directory in file-name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StillFrameBackend;

impl CaptureBackend for StillFrameBackend {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError> {
        let CaptureSource::Path(path) = source else {
            return Err(CaptureError::Unsupported(source.clone()));
        };
        let frames = if path.is_dir() {
            list_frames(path)?
        } else if path.is_file() && is_frame_file(path) {
            VecDeque::from([path.clone()])
        } else if path.exists() {
            return Err(CaptureError::Unsupported(source.clone()));
        } else {
            return Err(CaptureError::NotFound { path: path.clone() });
        };
        if frames.is_empty() {
            return Err(CaptureError::Empty { path: path.clone() });
        }
        Ok(Box::new(StillFrameReader {
            pending: frames,
            next_index: 0,
        }))
    }
}

fn list_frames(dir: &Path) -> Result<VecDeque<PathBuf>, CaptureError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CaptureError::Open {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CaptureError::Open {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames.into())
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

struct StillFrameReader {
    pending: VecDeque<PathBuf>,
    next_index: u64,
}

impl FrameReader for StillFrameReader {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|source| CaptureError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame { index, image }))
    }
}
