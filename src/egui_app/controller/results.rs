use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::detection::DetectionRecord;

const RESULT_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

/// First annotated image the engine saved into `dir`, preferring `.jpg`, then `.png`, then `.jpeg`.
pub(crate) fn find_result_image(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            let rank = RESULT_IMAGE_EXTENSIONS.iter().position(|known| *known == ext)?;
            Some((rank, path))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().map(|(_, path)| path)
}

/// Label file the engine writes for `source` inside a result folder.
pub(crate) fn label_path_for(output_dir: &Path, source: &Path) -> Option<PathBuf> {
    let mut name = source.file_stem()?.to_os_string();
    name.push(".txt");
    Some(output_dir.join("labels").join(name))
}

/// Per-image report; `detections` is `None` when the engine wrote no label file.
pub(crate) fn render_image_report(result_image: &Path, detections: Option<&[DetectionRecord]>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Detection complete");
    let _ = writeln!(out, "Saved to: {}", result_image.display());
    let _ = writeln!(out);
    match detections {
        Some(detections) => {
            let _ = writeln!(out, "Objects found: {}", detections.len());
            let _ = writeln!(out);
            let _ = writeln!(out, "Details:");
            for detection in detections {
                let _ = writeln!(
                    out,
                    "- {}: confidence {:.2}",
                    detection.label(),
                    detection.confidence.unwrap_or(0.0)
                );
            }
        }
        None => {
            let _ = writeln!(out, "No obvious defects detected");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::parse_line;
    use tempfile::tempdir;

    #[test]
    fn result_image_prefers_jpg() {
        let dir = tempdir().unwrap();
        for name in ["b.png", "c.jpeg", "z.jpg", "a.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(find_result_image(dir.path()), Some(dir.path().join("z.jpg")));
        assert_eq!(find_result_image(&dir.path().join("missing")), None);
    }

    #[test]
    fn label_path_uses_source_stem() {
        assert_eq!(
            label_path_for(Path::new("runs/detect/single_1"), Path::new("/data/plate 7.jpg")),
            Some(PathBuf::from("runs/detect/single_1/labels/plate 7.txt"))
        );
    }

    #[test]
    fn report_lists_detections_with_zero_for_missing_confidence() {
        let detections = vec![
            parse_line("0 0.5 0.5 0.1 0.1 0.87").unwrap(),
            parse_line("7 0.5 0.5 0.1 0.1").unwrap(),
        ];
        let report = render_image_report(Path::new("out/a.jpg"), Some(&detections));
        assert!(report.contains("Objects found: 2"));
        assert!(report.contains("- Crack: confidence 0.87"));
        assert!(report.contains("- Class 7: confidence 0.00"));
    }

    #[test]
    fn report_without_labels_notes_no_defects() {
        let report = render_image_report(Path::new("out/a.jpg"), None);
        assert!(report.contains("No obvious defects detected"));
        assert!(!report.contains("Objects found"));
    }
}
