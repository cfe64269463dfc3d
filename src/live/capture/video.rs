use image::RgbaImage;
use opencv::core::{AlgorithmHint, Mat};
use opencv::prelude::*;
use opencv::imgproc;
use opencv::videoio::{self, VideoCapture};

use super::{CaptureBackend, CaptureError, CaptureSource, Frame, FrameReader};

/// Cameras, video files and stream addresses opened through OpenCV's `VideoCapture`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoBackend;

impl CaptureBackend for VideoBackend {
    fn open(&self, source: &CaptureSource) -> Result<Box<dyn FrameReader>, CaptureError> {
        let opened = match source {
            CaptureSource::Device(index) => {
                let index =
                    i32::try_from(*index).map_err(|_| CaptureError::NotOpened(source.clone()))?;
                VideoCapture::new(index, videoio::CAP_ANY)
            }
            CaptureSource::Path(path) => {
                VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
            }
        };
        let capture = opened.map_err(|err| video_error(source, err))?;
        if !capture.is_opened().map_err(|err| video_error(source, err))? {
            return Err(CaptureError::NotOpened(source.clone()));
        }
        Ok(Box::new(VideoReader {
            capture,
            source: source.clone(),
            next_index: 0,
        }))
    }
}

fn video_error(source: &CaptureSource, err: opencv::Error) -> CaptureError {
    CaptureError::Video {
        capture: source.clone(),
        source: err,
    }
}

struct VideoReader {
    capture: VideoCapture,
    source: CaptureSource,
    next_index: u64,
}

impl VideoReader {
    fn to_rgba(&self, frame: &Mat) -> Result<RgbaImage, CaptureError> {
        let mut rgba = Mat::default();
        imgproc::cvt_color(
            frame,
            &mut rgba,
            imgproc::COLOR_BGR2RGBA,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|err| video_error(&self.source, err))?;
        let layout = || CaptureError::FrameLayout {
            capture: self.source.clone(),
        };
        let width = u32::try_from(rgba.cols()).map_err(|_| layout())?;
        let height = u32::try_from(rgba.rows()).map_err(|_| layout())?;
        let data = rgba
            .data_bytes()
            .map_err(|err| video_error(&self.source, err))?
            .to_vec();
        RgbaImage::from_raw(width, height, data).ok_or_else(layout)
    }
}

impl FrameReader for VideoReader {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|err| video_error(&self.source, err))?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        let image = self.to_rgba(&frame)?;
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame { index, image }))
    }
}
