use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::warn;

use super::annotate::draw_detections;
use super::capture::{CaptureBackend, CaptureError, CaptureSource, FrameReader};
use super::frame_slot::{AnnotatedFrame, FrameSlot};
use super::inference::{FrameInference, InferenceError, InferenceProvider};
use crate::log_queue::LogSender;

/// Observable state of the live runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveStatus {
    Idle,
    Running,
    /// Stop requested; the in-flight pass is finishing.
    Stopping,
}

impl LiveStatus {
    fn to_u8(self) -> u8 {
        match self {
            LiveStatus::Idle => 0,
            LiveStatus::Running => 1,
            LiveStatus::Stopping => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => LiveStatus::Running,
            2 => LiveStatus::Stopping,
            _ => LiveStatus::Idle,
        }
    }
}

impl fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiveStatus::Idle => "idle",
            LiveStatus::Running => "running",
            LiveStatus::Stopping => "stopping",
        })
    }
}

/// Parameters of one live session.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRequest {
    pub model: PathBuf,
    pub source: CaptureSource,
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Select a model file for live detection")]
    MissingModel,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("Failed to load model: {0}")]
    Inference(#[from] InferenceError),
    #[error("Failed to start live session thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Whether a start request actually started a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Stopped,
    Exhausted,
    CaptureFailed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndReason::Stopped => "stopped",
            EndReason::Exhausted => "source ended",
            EndReason::CaptureFailed => "capture failed",
        })
    }
}

struct LiveShared {
    should_continue: AtomicBool,
    status: AtomicU8,
    frames_processed: AtomicU64,
}

impl LiveShared {
    fn status(&self) -> LiveStatus {
        LiveStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: LiveStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    fn transition(&self, from: LiveStatus, to: LiveStatus) -> bool {
        self.status
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Owns at most one live session at a time.
///
/// The session thread checks `should_continue` before each read; [`LiveRunner::stop`]
/// only clears the flag, so a pass already underway finishes and publishes its frame.
pub struct LiveRunner {
    backend: Arc<dyn CaptureBackend>,
    provider: Arc<dyn InferenceProvider>,
    log: LogSender,
    slot: FrameSlot,
    shared: Arc<LiveShared>,
    worker: Option<JoinHandle<()>>,
}

impl LiveRunner {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        provider: Arc<dyn InferenceProvider>,
        log: LogSender,
        slot: FrameSlot,
    ) -> Self {
        Self {
            backend,
            provider,
            log,
            slot,
            shared: Arc::new(LiveShared {
                should_continue: AtomicBool::new(false),
                status: AtomicU8::new(LiveStatus::Idle.to_u8()),
                frames_processed: AtomicU64::new(0),
            }),
            worker: None,
        }
    }

    pub fn status(&self) -> LiveStatus {
        self.shared.status()
    }

    /// Frames published by the current or most recent session.
    pub fn frames_processed(&self) -> u64 {
        self.shared.frames_processed.load(Ordering::Acquire)
    }

    /// Open the source and model, then run the loop on a new thread.
    ///
    /// Does nothing unless the runner is idle. Open failures are logged as
    /// ERROR and leave the runner idle.
    pub fn start(&mut self, request: &LiveRequest) -> Result<StartOutcome, LiveError> {
        if !self.shared.transition(LiveStatus::Idle, LiveStatus::Running) {
            self.log.warning("Live detection is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.reap_worker();
        match self.spawn_session(request) {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(StartOutcome::Started)
            }
            Err(err) => {
                self.shared.should_continue.store(false, Ordering::Release);
                self.shared.set_status(LiveStatus::Idle);
                self.log.error(format!("Live detection failed to start: {err}"));
                Err(err)
            }
        }
    }

    fn spawn_session(&self, request: &LiveRequest) -> Result<JoinHandle<()>, LiveError> {
        if request.model.as_os_str().is_empty() {
            return Err(LiveError::MissingModel);
        }
        let reader = self.backend.open(&request.source)?;
        let inference = self.provider.load(&request.model, request.confidence)?;

        self.shared.frames_processed.store(0, Ordering::Release);
        self.shared.should_continue.store(true, Ordering::Release);
        self.log
            .system(format!("Live detection started on {}", request.source));

        let session = Session {
            reader,
            inference,
            shared: Arc::clone(&self.shared),
            slot: self.slot.clone(),
            log: self.log.clone(),
        };
        thread::Builder::new()
            .name("steelscan-live".into())
            .spawn(move || session.run())
            .map_err(LiveError::Thread)
    }

    /// Ask the running session to stop after its current pass.
    pub fn stop(&self) {
        if self
            .shared
            .transition(LiveStatus::Running, LiveStatus::Stopping)
        {
            self.shared.should_continue.store(false, Ordering::Release);
            self.log.info("Stopping live detection...");
        }
    }

    /// Block until the session thread, if any, has exited.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Live session thread panicked");
                self.shared.set_status(LiveStatus::Idle);
            }
        }
    }

    fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Previous live session thread panicked");
            }
        }
    }
}

impl Drop for LiveRunner {
    fn drop(&mut self) {
        self.shared.should_continue.store(false, Ordering::Release);
    }
}

struct Session {
    reader: Box<dyn FrameReader>,
    inference: Box<dyn FrameInference>,
    shared: Arc<LiveShared>,
    slot: FrameSlot,
    log: LogSender,
}

impl Session {
    fn run(mut self) {
        let mut processed = 0u64;
        let reason = loop {
            if !self.shared.should_continue.load(Ordering::Acquire) {
                break EndReason::Stopped;
            }
            let frame = match self.reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break EndReason::Exhausted,
                Err(err) => {
                    self.log.error(format!("Live capture error: {err}"));
                    break EndReason::CaptureFailed;
                }
            };
            let detections = match self.inference.infer(&frame) {
                Ok(detections) => detections,
                Err(err) => {
                    self.log
                        .warning(format!("Detection failed on frame {}: {err}", frame.index));
                    Vec::new()
                }
            };
            let mut image = frame.image;
            draw_detections(&mut image, &detections);
            self.slot.publish(AnnotatedFrame {
                index: frame.index,
                image,
                detections,
            });
            processed += 1;
            self.shared
                .frames_processed
                .store(processed, Ordering::Release);
        };
        self.shared.should_continue.store(false, Ordering::Release);
        self.log.system(format!(
            "Live detection ended ({reason}); {processed} frames processed"
        ));
        self.shared.set_status(LiveStatus::Idle);
    }
}
