use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::{DetectionRecord, parse_line};

/// A label file could not be opened.
#[derive(Debug, Error)]
#[error("Failed to open label file {path}: {source}")]
pub struct ParseError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Handle to one per-image label file; each call to [`LabelFile::records`] re-reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFile {
    path: PathBuf,
}

impl LabelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and stream its well-formed records in file order.
    pub fn records(&self) -> Result<LabelRecords, ParseError> {
        read_label_file(&self.path)
    }
}

/// Open `path` and lazily yield one [`DetectionRecord`] per well-formed line.
pub fn read_label_file(path: &Path) -> Result<LabelRecords, ParseError> {
    let file = File::open(path).map_err(|source| ParseError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LabelRecords {
        reader: BufReader::new(file),
        path: path.to_path_buf(),
        buf: Vec::new(),
        line_number: 0,
        done: false,
    })
}

/// Lazy, in-order record stream over one label file.
pub struct LabelRecords {
    reader: BufReader<File>,
    path: PathBuf,
    buf: Vec<u8>,
    line_number: usize,
    done: bool,
}

impl LabelRecords {
    fn next_line(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line_number += 1;
                Some(String::from_utf8_lossy(&self.buf).into_owned())
            }
            Err(err) => {
                warn!(
                    "Stopped reading {} at line {}: {err}",
                    self.path.display(),
                    self.line_number + 1
                );
                self.done = true;
                None
            }
        }
    }
}

impl Iterator for LabelRecords {
    type Item = DetectionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.next_line() {
            match parse_line(&line) {
                Ok(record) => return Some(record),
                Err(reason) => {
                    // Engine output is only partly trusted; bad lines are dropped.
                    debug!(
                        "Skipping {}:{}: {reason}",
                        self.path.display(),
                        self.line_number
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn yields_records_in_file_order_and_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("img.txt");
        std::fs::write(
            &path,
            "0 0.5 0.5 0.2 0.1 0.9\nabc not a number\n\n1 0.3 0.3 0.05 0.05 0.4\r\n4 0.1 0.1 0.1 0.1",
        )
        .unwrap();

        let records: Vec<_> = read_label_file(&path).unwrap().collect();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.class_id).collect::<Vec<_>>(),
            vec![0, 1, 4]
        );
        assert_eq!(records[1].confidence, Some(0.4));
        assert_eq!(records[2].confidence, None);
    }

    #[test]
    fn label_file_can_be_read_again() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("img.txt");
        std::fs::write(&path, "2 0.5 0.5 0.5 0.5 0.8\n").unwrap();
        let file = LabelFile::new(&path);
        let first: Vec<_> = file.records().unwrap().collect();
        let second: Vec<_> = file.records().unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn invalid_utf8_only_spoils_its_own_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("img.txt");
        let mut bytes = b"0 0.1 0.1 0.1 0.1 0.5\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"1 0.2 0.2 0.2 0.2 0.6\n");
        std::fs::write(&path, bytes).unwrap();
        let records: Vec<_> = read_label_file(&path).unwrap().collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let err = read_label_file(&path).err().expect("open should fail");
        assert_eq!(err.path, path);
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }
}
