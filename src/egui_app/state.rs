//! Presentation state owned by the controller and read by the renderer.

use image::RgbaImage;

use crate::batch::{ClassShare, HISTOGRAM_BINS};
use crate::config::JobDefaults;
use crate::jobs::{JobKind, JobParams, JobRequest};
use crate::live::{CaptureSource, LiveRequest, LiveStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Predict,
    Batch,
    Live,
    Train,
    Validate,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Predict,
        Page::Batch,
        Page::Live,
        Page::Train,
        Page::Validate,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Predict => "Predict",
            Page::Batch => "Batch",
            Page::Live => "Live",
            Page::Train => "Train",
            Page::Validate => "Validate",
        }
    }
}

/// Text-backed form fields for one job kind.
#[derive(Debug, Clone, PartialEq)]
pub struct JobForm {
    pub model: String,
    pub input: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub image_size: u32,
    pub confidence: f32,
}

impl JobForm {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            model: String::new(),
            input: String::new(),
            epochs: defaults.epochs,
            batch_size: defaults.batch_size,
            image_size: defaults.image_size,
            confidence: defaults.confidence,
        }
    }

    pub fn to_request(&self, kind: JobKind) -> JobRequest {
        JobRequest::new(
            kind,
            JobParams {
                model: self.model.trim().into(),
                input: self.input.trim().into(),
                epochs: self.epochs,
                batch_size: self.batch_size,
                image_size: self.image_size,
                confidence: self.confidence,
                run_name: None,
            },
        )
    }
}

/// An image shown on screen; `revision` bumps whenever the pixels change.
#[derive(Debug, Clone, Default)]
pub struct ImageView {
    image: Option<RgbaImage>,
    revision: u64,
}

impl ImageView {
    pub fn set(&mut self, image: RgbaImage) {
        self.image = Some(image);
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        if self.image.take().is_some() {
            self.revision += 1;
        }
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone)]
pub struct PredictState {
    pub form: JobForm,
    pub running: bool,
    pub result: ImageView,
    pub report: String,
}

#[derive(Debug, Clone)]
pub struct BatchState {
    pub form: JobForm,
    pub running: bool,
    pub report: String,
    pub shares: Vec<ClassShare>,
    pub histogram: [usize; HISTOGRAM_BINS],
}

#[derive(Debug, Clone)]
pub struct LiveState {
    pub model: String,
    pub source: String,
    pub confidence: f32,
    pub status: LiveStatus,
    pub frame: ImageView,
    pub last_frame_index: Option<u64>,
    pub last_detection_count: usize,
}

impl LiveState {
    pub fn to_request(&self) -> LiveRequest {
        LiveRequest {
            model: self.model.trim().into(),
            source: CaptureSource::parse(&self.source),
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainState {
    pub form: JobForm,
    pub running: bool,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidateState {
    pub form: JobForm,
    pub running: bool,
    pub transcript: Vec<String>,
}

impl PredictState {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            form: JobForm::new(defaults),
            running: false,
            result: ImageView::default(),
            report: String::new(),
        }
    }
}

impl BatchState {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            form: JobForm::new(defaults),
            running: false,
            report: String::new(),
            shares: Vec::new(),
            histogram: [0; HISTOGRAM_BINS],
        }
    }
}

impl LiveState {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            model: String::new(),
            source: String::new(),
            confidence: defaults.confidence,
            status: LiveStatus::Idle,
            frame: ImageView::default(),
            last_frame_index: None,
            last_detection_count: 0,
        }
    }
}

impl TrainState {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            form: JobForm::new(defaults),
            running: false,
            status: None,
        }
    }
}

impl ValidateState {
    pub fn new(defaults: &JobDefaults) -> Self {
        Self {
            form: JobForm::new(defaults),
            running: false,
            transcript: Vec::new(),
        }
    }
}
