//! Photo records read from a delimited flight list.
//!
//! One row per photo, in flight order. Fields are positional:
//!
//! | index | field |
//! |---|---|
//! | 0 | photo filename |
//! | 1 | center x (projected) |
//! | 2 | center y (projected) |
//! | `resolution_column` | ground sample resolution, m/px (optional) |
//!
//! Rows that fail to parse are returned in place as [`RejectedRow`] so the
//! caller can report them without losing the position of the good rows.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GroundPoint;

/// Errors for a single malformed input row.
#[derive(Debug, Error)]
pub enum InputError {
    /// A required field is absent or empty.
    #[error("missing {field} (column {column})")]
    MissingField { field: &'static str, column: usize },

    /// A numeric field does not hold a finite number.
    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// The resolution parsed but is not strictly positive.
    #[error("ground sample resolution must be positive, got {0}")]
    InvalidResolution(f64),

    /// The CSV reader failed on this row.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A row that could not be turned into a [`PhotoRecord`].
#[derive(Debug, Error)]
#[error("row {row}: {error}")]
pub struct RejectedRow {
    /// 1-based line number in the input.
    pub row: usize,
    /// Filename field, when the row got far enough to have one.
    pub filename: Option<String>,
    #[source]
    pub error: InputError,
}

/// One photo of the flight sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// 1-based line number in the input.
    pub row: usize,
    pub filename: String,
    pub center: GroundPoint,
    /// Ground sample resolution, meters per pixel.
    pub resolution: f64,
}

impl PhotoRecord {
    pub fn new(row: usize, filename: impl Into<String>, center: GroundPoint, resolution: f64) -> Self {
        Self {
            row,
            filename: filename.into(),
            center,
            resolution,
        }
    }
}

/// How rows of the flight list are laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordLayout {
    /// 0-indexed column holding the per-photo resolution.
    pub resolution_column: usize,
    /// Resolution used when the column is absent or empty.
    pub default_resolution: f64,
    /// Skip the first row as a header.
    pub has_header: bool,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            resolution_column: 7,
            default_resolution: 0.16,
            has_header: false,
        }
    }
}

/// Read every row of a flight list, preserving order.
///
/// Blank rows are skipped. Each remaining row yields either a record or a
/// [`RejectedRow`].
pub fn read_records<R: Read>(
    reader: R,
    layout: &RecordLayout,
) -> Vec<Result<PhotoRecord, RejectedRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(layout.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let first_row = if layout.has_header { 2 } else { 1 };
    let mut rows = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let fallback_row = first_row + index;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let row = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_row);
                rows.push(Err(RejectedRow {
                    row,
                    filename: None,
                    error: InputError::Csv(e),
                }));
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }

        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_row);

        rows.push(parse_row(row, &record, layout));
    }

    log::debug!("Read {} flight list rows", rows.len());
    rows
}

fn parse_row(
    row: usize,
    record: &csv::StringRecord,
    layout: &RecordLayout,
) -> Result<PhotoRecord, RejectedRow> {
    let filename = record.get(0).filter(|s| !s.is_empty()).map(str::to_string);
    let reject = |error: InputError| RejectedRow {
        row,
        filename: filename.clone(),
        error,
    };

    let name = filename.clone().ok_or_else(|| {
        reject(InputError::MissingField {
            field: "filename",
            column: 0,
        })
    })?;

    let x = required_number(record, 1, "center x").map_err(reject)?;
    let y = required_number(record, 2, "center y").map_err(reject)?;

    let resolution = match record
        .get(layout.resolution_column)
        .filter(|s| !s.is_empty())
    {
        Some(value) => {
            let resolution = parse_number(value, "resolution").map_err(reject)?;
            if resolution <= 0.0 {
                return Err(reject(InputError::InvalidResolution(resolution)));
            }
            resolution
        }
        None => layout.default_resolution,
    };

    Ok(PhotoRecord::new(row, name, GroundPoint::new(x, y), resolution))
}

fn required_number(
    record: &csv::StringRecord,
    column: usize,
    field: &'static str,
) -> Result<f64, InputError> {
    let value = record
        .get(column)
        .filter(|s| !s.is_empty())
        .ok_or(InputError::MissingField { field, column })?;
    parse_number(value, field)
}

fn parse_number(value: &str, field: &'static str) -> Result<f64, InputError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Vec<Result<PhotoRecord, RejectedRow>> {
        read_records(input.as_bytes(), &RecordLayout::default())
    }

    #[test]
    fn test_reads_rows_in_order() {
        let rows = read(
            "IMG_001.JPG,500000.0,1700000.0,a,b,c,d,0.15\n\
             IMG_002.JPG,500010.0,1700100.0,a,b,c,d,0.17\n",
        );

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.filename, "IMG_001.JPG");
        assert_eq!(first.center, GroundPoint::new(500000.0, 1700000.0));
        assert_eq!(first.resolution, 0.15);
        assert_eq!(first.row, 1);

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.filename, "IMG_002.JPG");
        assert_eq!(second.resolution, 0.17);
        assert_eq!(second.row, 2);
    }

    #[test]
    fn test_missing_resolution_uses_default() {
        let rows = read("IMG_001.JPG,1.0,2.0\n");
        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.resolution, 0.16);
    }

    #[test]
    fn test_empty_resolution_uses_default() {
        let rows = read("IMG_001.JPG,1.0,2.0,,,,,\n");
        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.resolution, 0.16);
    }

    #[test]
    fn test_custom_resolution_column() {
        let layout = RecordLayout {
            resolution_column: 3,
            ..RecordLayout::default()
        };
        let rows = read_records("a.jpg,1,2,0.5\n".as_bytes(), &layout);
        assert_eq!(rows[0].as_ref().unwrap().resolution, 0.5);
    }

    #[test]
    fn test_too_few_fields() {
        let rows = read("IMG_001.JPG,1.0\n");
        let rejected = rows[0].as_ref().unwrap_err();

        assert_eq!(rejected.row, 1);
        assert_eq!(rejected.filename.as_deref(), Some("IMG_001.JPG"));
        assert!(matches!(
            rejected.error,
            InputError::MissingField {
                field: "center y",
                column: 2
            }
        ));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let rows = read("IMG_001.JPG,east,2.0\n");
        let rejected = rows[0].as_ref().unwrap_err();
        assert!(matches!(rejected.error, InputError::InvalidNumber { .. }));
        assert_eq!(rejected.to_string(), "row 1: invalid center x 'east'");
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let rows = read("IMG_001.JPG,NaN,2.0\n");
        assert!(rows[0].is_err());
    }

    #[test]
    fn test_bad_resolution() {
        let rows = read("IMG_001.JPG,1,2,,,,,-0.1\nIMG_002.JPG,1,2,,,,,fast\n");
        assert!(matches!(
            rows[0].as_ref().unwrap_err().error,
            InputError::InvalidResolution(_)
        ));
        assert!(matches!(
            rows[1].as_ref().unwrap_err().error,
            InputError::InvalidNumber {
                field: "resolution",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_row_does_not_stop_reading() {
        let rows = read("a.jpg,1,2\nbroken\nc.jpg,5,6\n");

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
        assert_eq!(rows[2].as_ref().unwrap().filename, "c.jpg");
        assert_eq!(rows[2].as_ref().unwrap().row, 3);
    }

    #[test]
    fn test_header_is_skipped() {
        let layout = RecordLayout {
            has_header: true,
            ..RecordLayout::default()
        };
        let rows = read_records("name,x,y\na.jpg,1,2\n".as_bytes(), &layout);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().row, 2);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let rows = read(" a.jpg , 10.5 , 20.25 \n");
        let record = rows[0].as_ref().unwrap();
        assert_eq!(record.filename, "a.jpg");
        assert_eq!(record.center, GroundPoint::new(10.5, 20.25));
    }
}
