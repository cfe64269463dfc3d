use std::str::FromStr;

use thiserror::Error;

use super::ClassLabel;

/// One detected object within one image, in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRecord {
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Missing when the engine wrote the line without a score.
    pub confidence: Option<f64>,
}

impl DetectionRecord {
    /// Box area relative to the image area.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn label(&self) -> ClassLabel {
        ClassLabel::resolve(self.class_id)
    }
}

/// Why a single label line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("expected at least 5 fields, found {0}")]
    TooFewFields(usize),
    #[error("invalid class id `{0}`")]
    ClassId(String),
    #[error("invalid {field} value `{value}`")]
    Number { field: &'static str, value: String },
}

/// Parse one `class_id cx cy w h [confidence]` line.
pub fn parse_line(line: &str) -> Result<DetectionRecord, LineError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(LineError::TooFewFields(fields.len()));
    }
    let class_id = fields[0]
        .parse::<u32>()
        .map_err(|_| LineError::ClassId(fields[0].to_string()))?;
    let confidence = match fields.get(5) {
        Some(raw) => Some(parse_number("confidence", raw)?),
        None => None,
    };
    Ok(DetectionRecord {
        class_id,
        center_x: parse_number("center x", fields[1])?,
        center_y: parse_number("center y", fields[2])?,
        width: parse_number("width", fields[3])?,
        height: parse_number("height", fields[4])?,
        confidence,
    })
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, LineError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LineError::Number {
            field,
            value: raw.to_string(),
        }),
    }
}

impl FromStr for DetectionRecord {
    type Err = LineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_line(line)
    }
}
