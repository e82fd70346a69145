//! Sequential threading of photo centers along a flight line.
//!
//! Each photo's heading depends on the center of the photo before it, so the
//! records are walked strictly in input order and exactly one center is
//! carried forward at a time.
//!
//! # First Photo
//!
//! The first photo has no predecessor. It borrows the *second* photo's
//! center as its "previous" center, which makes its heading point backwards
//! along the line (the reverse of the true flight direction). Treating the
//! first photo as unrotated would be the alternative. A flight list with a
//! single photo has no flight line at all and yields `previous: None`.

use std::iter::Peekable;

use crate::heading::{estimate_heading, GeometryError, RotationAngle};
use crate::record::PhotoRecord;
use crate::GroundPoint;

/// One photo paired with the center used to derive its heading.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightStep {
    /// 0-based position among the valid records.
    pub index: usize,
    pub record: PhotoRecord,
    pub previous: Option<GroundPoint>,
}

impl FlightStep {
    /// Total rotation of this photo: flight heading plus `extra_rotation_deg`.
    pub fn rotation(&self, extra_rotation_deg: f64) -> Result<RotationAngle, GeometryError> {
        let previous = self.previous.ok_or(GeometryError::SinglePhoto)?;
        estimate_heading(previous, self.record.center, extra_rotation_deg)
    }
}

/// Iterator adapter pairing every record with its previous center.
///
/// Looks one record ahead only for the first photo.
pub struct FlightLine<I: Iterator<Item = PhotoRecord>> {
    records: Peekable<I>,
    previous: Option<GroundPoint>,
    index: usize,
}

impl<I: Iterator<Item = PhotoRecord>> FlightLine<I> {
    pub fn new(records: I) -> Self {
        Self {
            records: records.peekable(),
            previous: None,
            index: 0,
        }
    }
}

impl<I: Iterator<Item = PhotoRecord>> Iterator for FlightLine<I> {
    type Item = FlightStep;

    fn next(&mut self) -> Option<FlightStep> {
        let record = self.records.next()?;

        let previous = if self.index == 0 {
            self.records.peek().map(|second| second.center)
        } else {
            self.previous
        };

        self.previous = Some(record.center);
        let step = FlightStep {
            index: self.index,
            record,
            previous,
        };
        self.index += 1;
        Some(step)
    }
}

/// Pair each record with its previous center.
pub fn flight_line<I>(records: I) -> FlightLine<I::IntoIter>
where
    I: IntoIterator<Item = PhotoRecord>,
{
    FlightLine::new(records.into_iter())
}
