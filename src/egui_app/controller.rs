//! Presentation controller: owns page state and drives the orchestrator.

mod jobs;
mod results;

use std::time::Duration;

use crate::config::AppConfig;
use crate::live::LiveStatus;
use crate::log_queue::{LogSender, LogView};
use crate::orchestrator::Orchestrator;

use super::state::{BatchState, LiveState, Page, PredictState, TrainState, ValidateState};

/// All state the renderer reads, plus the orchestrator that feeds it.
///
/// Background work never touches this struct; everything it learns arrives
/// through [`AppController::poll`].
pub struct AppController {
    orchestrator: Orchestrator<AppController>,
    poll_interval: Duration,
    pub page: Page,
    pub log_view: LogView,
    pub predict: PredictState,
    pub batch: BatchState,
    pub live: LiveState,
    pub train: TrainState,
    pub validate: ValidateState,
}

impl AppController {
    pub fn new(config: AppConfig) -> Self {
        Self::with_orchestrator(Orchestrator::new(config))
    }

    pub fn with_orchestrator(orchestrator: Orchestrator<AppController>) -> Self {
        let defaults = orchestrator.config().defaults.clone();
        let ui = orchestrator.config().ui.clone();
        Self {
            poll_interval: ui.poll_interval(),
            log_view: LogView::with_capacity(ui.log_capacity),
            page: Page::Predict,
            predict: PredictState::new(&defaults),
            batch: BatchState::new(&defaults),
            live: LiveState::new(&defaults),
            train: TrainState::new(&defaults),
            validate: ValidateState::new(&defaults),
            orchestrator,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn log(&self) -> LogSender {
        self.orchestrator.log()
    }

    /// Drain everything background work produced since the last tick.
    ///
    /// Returns `true` when anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for task in self.orchestrator.drain_ui_tasks() {
            task(self);
            changed = true;
        }
        if let Some(frame) = self.orchestrator.take_frame() {
            self.live.last_frame_index = Some(frame.index);
            self.live.last_detection_count = frame.detections.len();
            self.live.frame.set(frame.image);
            changed = true;
        }
        let status = self.orchestrator.live_status();
        if status != self.live.status {
            self.live.status = status;
            changed = true;
        }
        changed |= self.orchestrator.drain_logs_into(&mut self.log_view) > 0;
        changed
    }

    pub fn start_live(&mut self) {
        let request = self.live.to_request();
        if self.orchestrator.start_live_session(&request).is_ok() {
            self.live.last_frame_index = None;
            self.live.last_detection_count = 0;
        }
        self.live.status = self.orchestrator.live_status();
    }

    pub fn stop_live(&mut self) {
        self.orchestrator.stop_live_session();
        self.live.status = self.orchestrator.live_status();
    }

    pub fn live_frames_processed(&self) -> u64 {
        self.orchestrator.live_frames_processed()
    }

    pub fn any_job_running(&self) -> bool {
        self.predict.running || self.batch.running || self.train.running || self.validate.running
    }

    /// Ask background work to wind down before the window closes.
    pub fn shutdown(&mut self) {
        if self.live.status != LiveStatus::Idle {
            self.orchestrator.stop_live_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_queue::Severity;

    #[test]
    fn poll_moves_logs_into_view() {
        let mut controller = AppController::new(AppConfig::default());
        assert!(!controller.poll());
        controller.log().system("hello");
        assert!(controller.poll());
        let last = controller.log_view.last().unwrap();
        assert_eq!(last.message, "hello");
        assert_eq!(last.severity, Severity::System);
    }

    #[test]
    fn live_start_with_unopenable_source_stays_idle() {
        let mut controller = AppController::new(AppConfig::default());
        controller.live.model = "best.pt".into();
        controller.live.source = "missing_frames/clip.mp4".into();
        controller.start_live();
        assert_eq!(controller.live.status, LiveStatus::Idle);
        controller.poll();
        assert_eq!(controller.log_view.last().unwrap().severity, Severity::Error);
    }
}
