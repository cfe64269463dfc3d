//! The surface the presentation layer talks to.
//!
//! [`Orchestrator`] ties together job launching, the live session, batch
//! aggregation and the channels the presentation loop drains. It is generic
//! over the presentation context `C` so exit callbacks can mutate it directly
//! once they are drained on the presentation thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::batch::{BatchError, BatchStatistics, aggregate_dir_with};
use crate::config::AppConfig;
use crate::jobs::{
    JobHandle, JobKind, JobRequest, JobState, ProcessManager, RequestError, SpawnError,
    UiDispatcher, UiScheduler, UiTask,
};
use crate::live::{
    AnnotatedFrame, CaptureBackend, DefaultCaptureBackend, EngineInferenceProvider, FrameSlot,
    InferenceProvider, LiveError, LiveRequest, LiveRunner, LiveStatus, StartOutcome,
};
use crate::log_queue::{LogQueue, LogSender, LogView};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// What an exit callback learns about the job that finished.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub kind: JobKind,
    pub state: JobState,
    /// Result folder of prediction jobs.
    pub output_dir: Option<PathBuf>,
}

impl JobOutcome {
    pub fn labels_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| dir.join("labels"))
    }
}

/// A job the orchestrator launched and still reports on.
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub kind: JobKind,
    pub handle: JobHandle,
}

pub struct Orchestrator<C> {
    config: AppConfig,
    logs: LogQueue,
    dispatcher: UiDispatcher<C>,
    processes: ProcessManager<C>,
    live: LiveRunner,
    frames: FrameSlot,
    jobs: Vec<TrackedJob>,
}

impl<C: 'static> Orchestrator<C> {
    /// Orchestrator using the default capture routing and engine-script inference for live sessions.
    pub fn new(config: AppConfig) -> Self {
        let provider = Arc::new(EngineInferenceProvider::new(config.engine.clone()));
        Self::with_live_backends(config, Arc::new(DefaultCaptureBackend), provider)
    }

    pub fn with_live_backends(
        config: AppConfig,
        capture: Arc<dyn CaptureBackend>,
        inference: Arc<dyn InferenceProvider>,
    ) -> Self {
        let logs = LogQueue::new();
        let dispatcher = UiDispatcher::new();
        let processes = ProcessManager::new(logs.sender(), dispatcher.scheduler());
        let frames = FrameSlot::new();
        let live = LiveRunner::new(capture, inference, logs.sender(), frames.clone());
        Self {
            config,
            logs,
            dispatcher,
            processes,
            live,
            frames,
            jobs: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn log(&self) -> LogSender {
        self.logs.sender()
    }

    pub fn scheduler(&self) -> UiScheduler<C> {
        self.dispatcher.scheduler()
    }

    /// Validate and launch `request`.
    ///
    /// `on_line` runs on the job's supervising thread for every output line;
    /// `on_exit` runs once on the presentation loop after the process ends.
    /// Rejections and spawn failures are logged as ERROR and returned.
    pub fn submit_job<L, E>(
        &mut self,
        request: &JobRequest,
        on_line: L,
        on_exit: E,
    ) -> Result<JobHandle, JobError>
    where
        L: FnMut(&str) + Send + 'static,
        E: FnOnce(&mut C, JobOutcome) + Send + 'static,
    {
        let prepared = match request.prepare(&self.config.engine) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.logs.sender().error(err.to_string());
                return Err(err.into());
            }
        };
        let kind = prepared.kind;
        let output_dir = prepared.output_dir.clone();
        let handle = self.processes.launch(&prepared.command, on_line, move |context, state| {
            on_exit(
                context,
                JobOutcome {
                    kind,
                    state,
                    output_dir,
                },
            )
        })?;
        self.jobs.push(TrackedJob {
            kind,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    /// Jobs still running, oldest first.
    pub fn running_jobs(&mut self) -> &[TrackedJob] {
        self.jobs.retain(|job| job.handle.is_running());
        &self.jobs
    }

    pub fn is_running(&mut self, kind: JobKind) -> bool {
        self.running_jobs().iter().any(|job| job.kind == kind)
    }

    pub fn start_live_session(&mut self, request: &LiveRequest) -> Result<StartOutcome, LiveError> {
        self.live.start(request)
    }

    pub fn stop_live_session(&self) {
        self.live.stop();
    }

    pub fn live_status(&self) -> LiveStatus {
        self.live.status()
    }

    pub fn live_frames_processed(&self) -> u64 {
        self.live.frames_processed()
    }

    /// Block until the live session thread has exited.
    pub fn wait_for_live_session(&mut self) {
        self.live.wait();
    }

    /// Aggregate the label files in `result_dir`; skipped files are logged as WARNING.
    pub fn get_batch_statistics(&self, result_dir: &Path) -> Result<BatchStatistics, BatchError> {
        let log = self.logs.sender();
        aggregate_dir_with(result_dir, |skipped| {
            log.warning(format!("Skipped label file: {skipped}"))
        })
    }

    /// Move queued log entries into `view`.
    pub fn drain_logs_into(&self, view: &mut LogView) -> usize {
        self.logs.drain_into(view)
    }

    /// Pending exit callbacks; the caller runs them against its context.
    pub fn drain_ui_tasks(&self) -> Vec<UiTask<C>> {
        self.dispatcher.drain()
    }

    /// Newest undisplayed live frame.
    pub fn take_frame(&self) -> Option<AnnotatedFrame> {
        self.frames.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobParams;
    use crate::log_queue::Severity;
    use tempfile::tempdir;

    #[test]
    fn rejected_request_is_logged_and_not_tracked() {
        let mut orchestrator = Orchestrator::<()>::new(AppConfig::default());
        let request = JobRequest::new(
            JobKind::Validate,
            JobParams::from_defaults(&AppConfig::default().defaults),
        );
        let err = orchestrator
            .submit_job(&request, |_| {}, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, JobError::Request(RequestError::MissingModel(_))));

        let mut view = LogView::with_capacity(10);
        assert_eq!(orchestrator.drain_logs_into(&mut view), 1);
        assert_eq!(view.last().unwrap().severity, Severity::Error);
        assert!(orchestrator.running_jobs().is_empty());
        assert!(orchestrator.drain_ui_tasks().is_empty());
    }

    #[test]
    fn batch_statistics_for_missing_dir_is_not_found() {
        let orchestrator = Orchestrator::<()>::new(AppConfig::default());
        let dir = tempdir().unwrap();
        let err = orchestrator
            .get_batch_statistics(&dir.path().join("labels"))
            .unwrap_err();
        assert!(matches!(err, BatchError::NotFound(_)));
    }

    #[test]
    fn batch_statistics_reads_label_dir() {
        let orchestrator = Orchestrator::<()>::new(AppConfig::default());
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("img1.txt"), "2 0.5 0.5 0.5 0.4 0.7\n").unwrap();
        std::fs::write(dir.path().join("img2.txt"), "2 0.5 0.5 0.1 0.1 0.9\n").unwrap();
        let stats = orchestrator.get_batch_statistics(dir.path()).unwrap();
        assert_eq!(stats.file_count(), 2);
        assert_eq!(stats.class_counts().get_by_name("Porosity"), 2);
        assert_eq!(stats.large_defect_count(), 1);
    }

    #[test]
    fn outcome_exposes_labels_dir() {
        let outcome = JobOutcome {
            kind: JobKind::BatchPredict,
            state: JobState::Completed,
            output_dir: Some(PathBuf::from("runs/detect/batch_1")),
        };
        assert_eq!(
            outcome.labels_dir(),
            Some(PathBuf::from("runs/detect/batch_1/labels"))
        );
    }
}
