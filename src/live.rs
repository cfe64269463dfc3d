//! Continuous frame-by-frame detection over a capture source.
//!
//! A [`LiveRunner`] owns one session thread at a time. Frames reach the
//! presentation loop through a [`FrameSlot`]; status messages go through the
//! log queue.

mod annotate;
mod capture;
mod frame_slot;
mod inference;
mod session;

pub use annotate::draw_detections;
pub use capture::{
    CaptureBackend, CaptureError, CaptureSource, DefaultCaptureBackend, Frame, FrameReader,
    StillFrameBackend,
};
#[cfg(feature = "camera")]
pub use capture::VideoBackend;
pub use frame_slot::{AnnotatedFrame, FrameSlot};
pub use inference::{
    EngineFrameInference, EngineInferenceProvider, FrameInference, InferenceError, InferenceProvider,
};
pub use session::{LiveError, LiveRequest, LiveRunner, LiveStatus, StartOutcome};
