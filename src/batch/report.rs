use std::fmt::{self, Write as _};
use std::path::Path;

use super::BatchStatistics;
use crate::detection::ClassLabel;

/// Relative area above which a defect counts as large.
pub const LARGE_DEFECT_AREA: f64 = 0.1;
/// Bin count of the confidence histogram.
pub const HISTOGRAM_BINS: usize = 10;

const HIGH_CONFIDENCE: f64 = 0.8;
const LOW_CONFIDENCE: f64 = 0.5;

/// Qualitative remark attached to a batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remark {
    HighConfidence,
    LowConfidence,
    NoDefects,
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Remark::HighConfidence => "High detection confidence; results are reliable.",
            Remark::LowConfidence => "Average confidence is low; manual review recommended.",
            Remark::NoDefects => "No defects found; excellent batch quality.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaRange {
    pub min: f64,
    pub max: f64,
}

/// Share of one class in the total defect count, for pie-style charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassShare {
    pub label: ClassLabel,
    pub count: usize,
    pub fraction: f64,
}

/// Metrics derived from [`BatchStatistics`] after the fold.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Mean of the recorded confidences, 0 when none were recorded.
    pub average_confidence: f64,
    /// `None` when no boxes were recorded.
    pub area_range: Option<AreaRange>,
    pub large_defect_count: usize,
    pub remarks: Vec<Remark>,
}

impl BatchStatistics {
    pub fn average_confidence(&self) -> f64 {
        let confidences = self.confidences();
        if confidences.is_empty() {
            return 0.0;
        }
        confidences.iter().sum::<f64>() / confidences.len() as f64
    }

    pub fn area_range(&self) -> Option<AreaRange> {
        let mut areas = self.areas().iter().copied();
        let first = areas.next()?;
        Some(areas.fold(AreaRange { min: first, max: first }, |range, area| AreaRange {
            min: range.min.min(area),
            max: range.max.max(area),
        }))
    }

    pub fn large_defect_count(&self) -> usize {
        self.areas()
            .iter()
            .filter(|area| **area > LARGE_DEFECT_AREA)
            .count()
    }

    /// Remarks are checked independently of each other. The confidence checks
    /// only apply once there is at least one defect to be confident about.
    pub fn remarks(&self) -> Vec<Remark> {
        let mut remarks = Vec::new();
        let average = self.average_confidence();
        if self.defect_count() > 0 {
            if average > HIGH_CONFIDENCE {
                remarks.push(Remark::HighConfidence);
            } else if average < LOW_CONFIDENCE {
                remarks.push(Remark::LowConfidence);
            }
        }
        if self.defect_count() == 0 {
            remarks.push(Remark::NoDefects);
        }
        remarks
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            average_confidence: self.average_confidence(),
            area_range: self.area_range(),
            large_defect_count: self.large_defect_count(),
            remarks: self.remarks(),
        }
    }

    /// Class shares in ranking order.
    pub fn class_shares(&self) -> Vec<ClassShare> {
        let total = self.defect_count();
        self.class_counts()
            .ranked()
            .into_iter()
            .map(|entry| ClassShare {
                label: entry.label,
                count: entry.count,
                fraction: if total == 0 {
                    0.0
                } else {
                    entry.count as f64 / total as f64
                },
            })
            .collect()
    }

    /// Counts of confidences in [`HISTOGRAM_BINS`] equal-width bins over `[0, 1]`.
    pub fn confidence_histogram(&self) -> [usize; HISTOGRAM_BINS] {
        let mut bins = [0usize; HISTOGRAM_BINS];
        for confidence in self.confidences() {
            let scaled = (confidence.clamp(0.0, 1.0) * HISTOGRAM_BINS as f64) as usize;
            bins[scaled.min(HISTOGRAM_BINS - 1)] += 1;
        }
        bins
    }
}

/// Render the plain-text batch report shown after a batch prediction.
pub fn render_report(stats: &BatchStatistics, output_dir: &Path) -> String {
    let summary = stats.summary();
    let mut out = String::new();
    let _ = writeln!(out, "Batch detection report");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out, "Output directory: {}", output_dir.display());
    let _ = writeln!(out, "Files with defects: {}", stats.file_count());
    let _ = writeln!(out, "Total defects: {}", stats.defect_count());
    let _ = writeln!(
        out,
        "Average confidence: {:.2}%",
        summary.average_confidence * 100.0
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Defects per class:");
    for share in stats.class_shares() {
        let _ = writeln!(
            out,
            "  - {}: {} ({:.1}%)",
            share.label,
            share.count,
            share.fraction * 100.0
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Defect size (relative area):");
    match summary.area_range {
        Some(range) => {
            let _ = writeln!(out, "  - Largest: {:.4}", range.max);
            let _ = writeln!(out, "  - Smallest: {:.4}", range.min);
            let _ = writeln!(
                out,
                "  - Large defects (>{:.0}%): {}",
                LARGE_DEFECT_AREA * 100.0,
                summary.large_defect_count
            );
        }
        None => {
            let _ = writeln!(out, "  No size data");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Assessment:");
    for remark in &summary.remarks {
        let _ = writeln!(out, "  {remark}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::aggregate_records;
    use crate::detection::parse_line;

    fn stats_from(lines: &[&str]) -> BatchStatistics {
        aggregate_records(
            1,
            lines.iter().map(|line| parse_line(line).expect("valid line")),
        )
    }

    #[test]
    fn average_of_two_confidences() {
        let stats = stats_from(&["0 0.5 0.5 0.2 0.1 0.9", "1 0.3 0.3 0.05 0.05 0.4"]);
        assert!((stats.average_confidence() - 0.65).abs() < 1e-9);
        assert!(stats.remarks().is_empty());
        let range = stats.area_range().unwrap();
        assert!((range.max - 0.02).abs() < 1e-12);
        assert!((range.min - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn empty_batch_has_only_no_defect_remark() {
        let stats = aggregate_records(0, Vec::new());
        let summary = stats.summary();
        assert_eq!(summary.average_confidence, 0.0);
        assert_eq!(summary.area_range, None);
        assert_eq!(summary.large_defect_count, 0);
        assert_eq!(summary.remarks, vec![Remark::NoDefects]);
    }

    #[test]
    fn confidence_remarks_follow_thresholds() {
        let high = stats_from(&["0 0.5 0.5 0.1 0.1 0.95", "0 0.5 0.5 0.1 0.1 0.85"]);
        assert_eq!(high.remarks(), vec![Remark::HighConfidence]);

        let low = stats_from(&["0 0.5 0.5 0.1 0.1 0.3"]);
        assert_eq!(low.remarks(), vec![Remark::LowConfidence]);

        let boundary = stats_from(&["0 0.5 0.5 0.1 0.1 0.8"]);
        assert!(boundary.remarks().is_empty());

        let unscored = stats_from(&["0 0.5 0.5 0.1 0.1"]);
        assert_eq!(unscored.remarks(), vec![Remark::LowConfidence]);
    }

    #[test]
    fn large_defects_use_strict_threshold() {
        let small = stats_from(&["0 0.5 0.5 0.2 0.5", "0 0.5 0.5 0.1 0.1"]);
        assert_eq!(small.large_defect_count(), 0);

        let one_large = stats_from(&["0 0.5 0.5 0.5 0.3", "0 0.5 0.5 0.1 0.1"]);
        assert_eq!(one_large.large_defect_count(), 1);
    }

    #[test]
    fn histogram_places_edges_in_outer_bins() {
        let stats = stats_from(&[
            "0 0.5 0.5 0.1 0.1 0.0",
            "0 0.5 0.5 0.1 0.1 0.05",
            "0 0.5 0.5 0.1 0.1 0.55",
            "0 0.5 0.5 0.1 0.1 1.0",
        ]);
        let bins = stats.confidence_histogram();
        assert_eq!(bins[0], 2);
        assert_eq!(bins[5], 1);
        assert_eq!(bins[9], 1);
        assert_eq!(bins.iter().sum::<usize>(), 4);
    }

    #[test]
    fn report_lists_ranked_classes_and_remarks() {
        let stats = stats_from(&[
            "1 0.5 0.5 0.1 0.1 0.9",
            "0 0.5 0.5 0.5 0.5 0.9",
            "0 0.5 0.5 0.1 0.1 0.9",
        ]);
        let report = render_report(&stats, Path::new("runs/detect/batch_120000"));
        assert!(report.contains("Total defects: 3"));
        assert!(report.contains("Average confidence: 90.00%"));
        let crack = report.find("Crack: 2 (66.7%)").expect("crack line");
        let inclusion = report.find("Inclusion: 1 (33.3%)").expect("inclusion line");
        assert!(crack < inclusion);
        assert!(report.contains("Large defects (>10%): 1"));
        assert!(report.contains(&Remark::HighConfidence.to_string()));
    }

    #[test]
    fn report_without_boxes_says_no_size_data() {
        let stats = aggregate_records(0, Vec::new());
        let report = render_report(&stats, Path::new("out"));
        assert!(report.contains("No size data"));
        assert!(report.contains(&Remark::NoDefects.to_string()));
    }
}
