use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::detection::{ClassLabel, DetectionRecord, LabelFile, ParseError};

/// The result directory handed to the aggregator does not exist.
#[derive(Debug, Error)]
#[error("Result directory not found: {path}")]
pub struct NotFoundError {
    pub path: PathBuf,
}

/// Failures that prevent a whole aggregation.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("Failed to list result directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Something in the directory was skipped; the batch continues without it.
#[derive(Debug, Error)]
pub enum SkippedEntry {
    #[error("Failed to read an entry of {dir}: {source}")]
    Entry {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    File(#[from] ParseError),
}

/// Count of records for one class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCount {
    pub label: ClassLabel,
    pub count: usize,
}

/// Per-class record counts, kept in the order classes were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCounts {
    entries: Vec<ClassCount>,
}

impl ClassCounts {
    fn increment(&mut self, label: ClassLabel) {
        match self.entries.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.count += 1,
            None => self.entries.push(ClassCount { label, count: 1 }),
        }
    }

    pub fn get(&self, label: ClassLabel) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map_or(0, |entry| entry.count)
    }

    /// Look up a count by its rendered label, e.g. `"Crack"` or `"Class 9"`.
    pub fn get_by_name(&self, name: &str) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.label.to_string() == name)
            .map_or(0, |entry| entry.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassCount> {
        self.entries.iter()
    }

    /// Entries by descending count; equal counts keep discovery order.
    pub fn ranked(&self) -> Vec<ClassCount> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

/// Aggregate over every label file of one batch result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatistics {
    file_count: usize,
    defect_count: usize,
    class_counts: ClassCounts,
    confidences: Vec<f64>,
    areas: Vec<f64>,
}

impl BatchStatistics {
    /// Label files that yielded at least one record.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Total records across all files; always equals `class_counts().total()`.
    pub fn defect_count(&self) -> usize {
        self.defect_count
    }

    pub fn class_counts(&self) -> &ClassCounts {
        &self.class_counts
    }

    /// Confidence values of records that carried one, in visit order.
    pub fn confidences(&self) -> &[f64] {
        &self.confidences
    }

    /// `width * height` of every record, in visit order.
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    fn record(&mut self, record: &DetectionRecord) {
        self.defect_count += 1;
        self.class_counts.increment(record.label());
        if let Some(confidence) = record.confidence {
            self.confidences.push(confidence);
        }
        self.areas.push(record.area());
    }
}

/// Fold records into statistics as if they came from `file_count` files.
pub fn aggregate_records<I>(file_count: usize, records: I) -> BatchStatistics
where
    I: IntoIterator<Item = DetectionRecord>,
{
    let mut stats = BatchStatistics {
        file_count,
        ..BatchStatistics::default()
    };
    for record in records {
        stats.record(&record);
    }
    stats
}

/// Aggregate every `.txt` label file directly inside `dir`, logging skipped files.
pub fn aggregate_dir(dir: &Path) -> Result<BatchStatistics, BatchError> {
    aggregate_dir_with(dir, |skipped| warn!("Skipping label file: {skipped}"))
}

/// Aggregate `dir`, reporting each unreadable entry to `on_skipped` and continuing.
///
/// Files are visited in file-name order so repeated runs over an unchanged
/// directory produce identical statistics.
pub fn aggregate_dir_with<F>(dir: &Path, mut on_skipped: F) -> Result<BatchStatistics, BatchError>
where
    F: FnMut(&SkippedEntry),
{
    if !dir.is_dir() {
        return Err(NotFoundError {
            path: dir.to_path_buf(),
        }
        .into());
    }
    let label_files = list_label_files(dir, &mut on_skipped)?;
    let stats = fold_label_files(label_files, &mut on_skipped);
    info!(
        "Aggregated {} label files with {} detections from {}",
        stats.file_count,
        stats.defect_count,
        dir.display()
    );
    Ok(stats)
}

/// Fold `label_files` in order. A file that cannot be opened is reported and
/// skipped; empty or fully malformed files add nothing, not even to `file_count`.
fn fold_label_files<F>(label_files: Vec<LabelFile>, on_skipped: &mut F) -> BatchStatistics
where
    F: FnMut(&SkippedEntry),
{
    let mut stats = BatchStatistics::default();
    for label_file in label_files {
        let records = match label_file.records() {
            Ok(records) => records,
            Err(err) => {
                on_skipped(&SkippedEntry::File(err));
                continue;
            }
        };
        let before = stats.defect_count;
        for record in records {
            stats.record(&record);
        }
        if stats.defect_count > before {
            stats.file_count += 1;
        }
    }
    stats
}

fn list_label_files<F>(dir: &Path, on_skipped: &mut F) -> Result<Vec<LabelFile>, BatchError>
where
    F: FnMut(&SkippedEntry),
{
    let entries = std::fs::read_dir(dir).map_err(|source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                on_skipped(&SkippedEntry::Entry {
                    dir: dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        let path = entry.path();
        // Dangling links are kept so that opening them is reported as a skip.
        if is_label_file(&path) && !path.is_dir() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths.into_iter().map(LabelFile::new).collect())
}

fn is_label_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}
