//! Detection label records written by the external engine.
//!
//! One label file per image, one line per detected object:
//! `class_id cx cy w h [confidence]` with geometry normalized to `[0, 1]`.

mod parser;
mod record;
mod vocabulary;

pub use parser::{LabelFile, LabelRecords, ParseError, read_label_file};
pub use record::{DetectionRecord, LineError, parse_line};
pub use vocabulary::{ClassLabel, DefectClass};
