//! Batch prediction analytics: fold a directory of label files into summary
//! statistics and render them as a report.

mod aggregator;
mod report;

pub use aggregator::{
    BatchError, BatchStatistics, ClassCount, ClassCounts, NotFoundError, SkippedEntry,
    aggregate_dir, aggregate_dir_with, aggregate_records,
};
pub use report::{
    AreaRange, BatchSummary, ClassShare, HISTOGRAM_BINS, LARGE_DEFECT_AREA, Remark,
    render_report,
};
