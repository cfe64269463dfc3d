#![cfg(unix)]

mod support;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use steelscan::config::{AppConfig, EngineSettings};
use steelscan::jobs::{JobKind, JobParams, JobRequest, JobState};
use steelscan::log_queue::{LogView, Severity};
use steelscan::orchestrator::{JobError, JobOutcome, Orchestrator};
use support::scripts::write_engine_script;
use tempfile::tempdir;

/// Presentation context stand-in for the orchestrator's exit callbacks.
#[derive(Default)]
struct Screen {
    exits: Vec<JobOutcome>,
}

fn run_tasks(orchestrator: &Orchestrator<Screen>, screen: &mut Screen) {
    for task in orchestrator.drain_ui_tasks() {
        task(screen);
    }
}

// Arguments arrive as: --model M --source S --name N --save --save_txt --project P --conf C
const BATCH_ENGINE: &str = r#"
echo "predicting $4"
out="${10}/$6/labels"
mkdir -p "$out"
printf '0 0.5 0.5 0.2 0.1 0.9\n1 0.3 0.3 0.05 0.05 0.4\n' > "$out/a.txt"
printf '0 0.5 0.5 0.5 0.5 0.95\n' > "$out/b.txt"
echo "done"
"#;

#[test]
fn batch_job_completion_feeds_the_aggregator() {
    let work = tempdir().unwrap();
    let config = AppConfig {
        engine: EngineSettings {
            interpreter: PathBuf::from("sh"),
            predict_script: write_engine_script(work.path(), "predict.sh", BATCH_ENGINE),
            project_dir: work.path().join("runs"),
            ..EngineSettings::default()
        },
        ..AppConfig::default()
    };
    let mut orchestrator = Orchestrator::<Screen>::new(config.clone());
    let mut params = JobParams::from_defaults(&config.defaults);
    params.model = "best.pt".into();
    params.input = work.path().join("images");
    params.run_name = Some("batch_test".into());

    orchestrator
        .submit_job(
            &JobRequest::new(JobKind::BatchPredict, params),
            |_| {},
            |screen: &mut Screen, outcome| screen.exits.push(outcome),
        )
        .expect("submit");

    let mut screen = Screen::default();
    let deadline = Instant::now() + Duration::from_secs(20);
    while screen.exits.is_empty() && Instant::now() < deadline {
        run_tasks(&orchestrator, &mut screen);
        std::thread::sleep(Duration::from_millis(10));
    }
    let outcome = screen.exits.pop().expect("exit callback ran");
    assert_eq!(outcome.state, JobState::Completed);
    assert_eq!(outcome.kind, JobKind::BatchPredict);

    let labels = outcome.labels_dir().unwrap();
    assert_eq!(labels, work.path().join("runs").join("batch_test").join("labels"));
    let stats = orchestrator.get_batch_statistics(&labels).unwrap();
    assert_eq!(stats.file_count(), 2);
    assert_eq!(stats.defect_count(), 3);
    assert_eq!(stats.large_defect_count(), 1);
    assert!(!orchestrator.is_running(JobKind::BatchPredict));

    let mut view = LogView::with_capacity(100);
    orchestrator.drain_logs_into(&mut view);
    let info: Vec<&str> = view
        .entries()
        .filter(|entry| entry.severity == Severity::Info)
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(info.len(), 2);
    assert!(info[0].starts_with("predicting "));
    assert_eq!(info[1], "done");
}

#[test]
fn unknown_interpreter_surfaces_spawn_error_in_log() {
    let config = AppConfig {
        engine: EngineSettings {
            interpreter: PathBuf::from("/nonexistent/steelscan/python"),
            ..EngineSettings::default()
        },
        ..AppConfig::default()
    };
    let mut orchestrator = Orchestrator::<Screen>::new(config.clone());
    let mut params = JobParams::from_defaults(&config.defaults);
    params.model = "best.pt".into();
    params.input = "data.yaml".into();

    let result = orchestrator.submit_job(
        &JobRequest::new(JobKind::Validate, params),
        |_| {},
        |screen: &mut Screen, outcome| screen.exits.push(outcome),
    );
    assert!(matches!(result, Err(JobError::Spawn(_))));

    let mut screen = Screen::default();
    std::thread::sleep(Duration::from_millis(50));
    run_tasks(&orchestrator, &mut screen);
    assert!(screen.exits.is_empty());

    let mut view = LogView::with_capacity(10);
    orchestrator.drain_logs_into(&mut view);
    let last = view.last().unwrap();
    assert_eq!(last.severity, Severity::Error);
    assert!(last.message.contains("/nonexistent/steelscan/python"));
}
