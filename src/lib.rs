//! Library exports for reuse in binaries, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Batch aggregation of label files and report rendering.
pub mod batch;
/// Persisted application settings.
pub mod config;
/// Label-file records and the class vocabulary.
pub mod detection;
/// egui presentation layer.
pub mod egui_app;
/// External job requests and process supervision.
pub mod jobs;
/// Live frame-by-frame inference.
pub mod live;
/// Log hand-off from background threads to the presentation loop.
pub mod log_queue;
/// Tracing subscriber setup and log file rotation.
pub mod logging;
/// Presentation-facing facade over jobs, live sessions and aggregation.
pub mod orchestrator;
