use std::path::PathBuf;

use super::AppController;
use super::results::{find_result_image, label_path_for, render_image_report};
use crate::batch::{BatchError, HISTOGRAM_BINS, render_report};
use crate::detection::read_label_file;
use crate::jobs::{JobKind, JobState};
use crate::orchestrator::JobOutcome;

impl AppController {
    pub fn run_prediction(&mut self) {
        let request = self.predict.form.to_request(JobKind::Predict);
        let source = request.params.input.clone();
        let submitted = self.orchestrator.submit_job(
            &request,
            |_| {},
            move |controller: &mut AppController, outcome| controller.finish_prediction(outcome, source),
        );
        self.predict.running = submitted.is_ok();
    }

    pub fn run_batch_prediction(&mut self) {
        let request = self.batch.form.to_request(JobKind::BatchPredict);
        let submitted = self.orchestrator.submit_job(
            &request,
            |_| {},
            |controller: &mut AppController, outcome| controller.finish_batch(outcome),
        );
        self.batch.running = submitted.is_ok();
    }

    pub fn run_training(&mut self) {
        let request = self.train.form.to_request(JobKind::Train);
        let submitted = self.orchestrator.submit_job(
            &request,
            |_| {},
            |controller: &mut AppController, outcome| controller.finish_training(outcome),
        );
        self.train.running = submitted.is_ok();
        self.train.status = submitted.is_ok().then(|| "Training in progress...".to_string());
    }

    pub fn run_validation(&mut self) {
        let request = self.validate.form.to_request(JobKind::Validate);
        self.validate.transcript.clear();
        self.validate
            .transcript
            .push("Starting validation...".to_string());
        let scheduler = self.orchestrator.scheduler();
        let submitted = self.orchestrator.submit_job(
            &request,
            move |line| {
                let line = line.to_string();
                scheduler.schedule(move |controller: &mut AppController| {
                    controller.validate.transcript.push(line)
                });
            },
            |controller: &mut AppController, outcome| controller.finish_validation(outcome),
        );
        self.validate.running = submitted.is_ok();
    }

    fn finish_prediction(&mut self, outcome: JobOutcome, source: PathBuf) {
        self.predict.running = false;
        if outcome.state != JobState::Completed {
            return;
        }
        let Some(output_dir) = outcome.output_dir else {
            return;
        };
        let log = self.log();
        let Some(image_path) = find_result_image(&output_dir) else {
            log.warning(format!("No result image found in {}", output_dir.display()));
            return;
        };
        match image::open(&image_path) {
            Ok(image) => self.predict.result.set(image.to_rgba8()),
            Err(err) => {
                self.predict.result.clear();
                log.error(format!(
                    "Failed to load result image {}: {err}",
                    image_path.display()
                ));
            }
        }
        let detections = label_path_for(&output_dir, &source)
            .filter(|path| path.is_file())
            .and_then(|path| match read_label_file(&path) {
                Ok(records) => Some(records.collect::<Vec<_>>()),
                Err(err) => {
                    log.warning(err.to_string());
                    None
                }
            });
        self.predict.report = render_image_report(&image_path, detections.as_deref());
        log.system("Prediction result updated");
    }

    fn finish_batch(&mut self, outcome: JobOutcome) {
        self.batch.running = false;
        if outcome.state != JobState::Completed {
            return;
        }
        let (Some(output_dir), Some(labels_dir)) = (outcome.output_dir.clone(), outcome.labels_dir())
        else {
            return;
        };
        let log = self.log();
        log.system("Batch processing finished, generating report...");
        self.batch.shares.clear();
        self.batch.histogram = [0; HISTOGRAM_BINS];
        match self.orchestrator.get_batch_statistics(&labels_dir) {
            Ok(stats) => {
                self.batch.report = render_report(&stats, &output_dir);
                self.batch.shares = stats.class_shares();
                self.batch.histogram = stats.confidence_histogram();
                log.system(format!(
                    "Batch report ready: {} defects in {} files",
                    stats.defect_count(),
                    stats.file_count()
                ));
            }
            Err(BatchError::NotFound(_)) => {
                self.batch.report.clear();
                log.warning("Labels directory not found, possibly no detections");
            }
            Err(err) => {
                self.batch.report.clear();
                log.error(err.to_string());
            }
        }
    }

    fn finish_training(&mut self, outcome: JobOutcome) {
        self.train.running = false;
        self.train.status = Some(match outcome.state {
            JobState::Completed => "Training finished".to_string(),
            _ => "Training failed; see the log for details".to_string(),
        });
    }

    fn finish_validation(&mut self, outcome: JobOutcome) {
        self.validate.running = false;
        self.validate.transcript.push(match outcome.state {
            JobState::Completed => "Validation finished".to_string(),
            _ => "Validation failed".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::log_queue::Severity;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn outcome(kind: JobKind, output_dir: Option<PathBuf>) -> JobOutcome {
        JobOutcome {
            kind,
            state: JobState::Completed,
            output_dir,
        }
    }

    #[test]
    fn batch_without_labels_dir_warns() {
        let mut controller = AppController::new(AppConfig::default());
        let dir = tempdir().unwrap();
        controller.batch.running = true;
        controller.finish_batch(outcome(JobKind::BatchPredict, Some(dir.path().to_path_buf())));
        controller.poll();

        assert!(!controller.batch.running);
        assert!(controller.batch.report.is_empty());
        let last = controller.log_view.last().unwrap();
        assert_eq!(last.severity, Severity::Warning);
        assert!(last.message.contains("Labels directory not found"));
    }

    #[test]
    fn batch_with_labels_renders_report_and_chart_data() {
        let mut controller = AppController::new(AppConfig::default());
        let dir = tempdir().unwrap();
        let labels = dir.path().join("labels");
        std::fs::create_dir(&labels).unwrap();
        std::fs::write(labels.join("a.txt"), "0 0.5 0.5 0.2 0.1 0.9\n1 0.3 0.3 0.05 0.05 0.4\n").unwrap();

        controller.finish_batch(outcome(JobKind::BatchPredict, Some(dir.path().to_path_buf())));
        assert!(controller.batch.report.contains("Total defects: 2"));
        assert!(controller.batch.report.contains("Average confidence: 65.00%"));
        assert_eq!(controller.batch.shares.len(), 2);
        assert_eq!(controller.batch.histogram.iter().sum::<usize>(), 2);
    }

    #[test]
    fn prediction_loads_image_and_reports_labels() {
        let mut controller = AppController::new(AppConfig::default());
        let dir = tempdir().unwrap();
        RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255]))
            .save(dir.path().join("plate.png"))
            .unwrap();
        std::fs::create_dir(dir.path().join("labels")).unwrap();
        std::fs::write(dir.path().join("labels").join("plate.txt"), "3 0.5 0.5 0.1 0.1 0.72\n").unwrap();

        controller.finish_prediction(
            outcome(JobKind::Predict, Some(dir.path().to_path_buf())),
            PathBuf::from("/inputs/plate.jpg"),
        );
        assert_eq!(controller.predict.result.image().map(|img| img.dimensions()), Some((3, 2)));
        assert!(controller.predict.report.contains("Objects found: 1"));
        assert!(controller.predict.report.contains("Scratch: confidence 0.72"));
    }

    #[test]
    fn prediction_without_image_logs_warning() {
        let mut controller = AppController::new(AppConfig::default());
        let dir = tempdir().unwrap();
        controller.finish_prediction(
            outcome(JobKind::Predict, Some(dir.path().to_path_buf())),
            PathBuf::from("plate.jpg"),
        );
        controller.poll();
        assert_eq!(controller.log_view.last().unwrap().severity, Severity::Warning);
        assert!(controller.predict.report.is_empty());
    }

    #[test]
    fn failed_training_sets_status() {
        let mut controller = AppController::new(AppConfig::default());
        controller.train.running = true;
        controller.finish_training(JobOutcome {
            kind: JobKind::Train,
            state: JobState::Failed,
            output_dir: None,
        });
        assert!(!controller.train.running);
        assert!(controller.train.status.as_deref().unwrap().contains("failed"));
    }
}
