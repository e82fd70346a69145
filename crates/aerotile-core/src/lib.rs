//! Aerotile Core - aerial photo georeferencing
//!
//! This crate turns a sequence of aerial photos, each with a known ground
//! center, into georeferenced GeoTIFFs: the flight heading between
//! consecutive centers gives each photo's rotation, the rotated crop window
//! gives its ground bounding box, and the bounding box becomes the raster's
//! affine transform.

pub mod batch;
pub mod config;
pub mod flight;
pub mod geometry;
pub mod heading;
pub mod raster;
pub mod record;
pub mod srs;
pub mod transform;

pub use batch::{BatchReport, GeoAnchorSummary, Georeferencer, PhotoError, PhotoReport};
pub use config::{ConfigError, GeorefConfig};
pub use flight::{flight_line, FlightLine, FlightStep};
pub use geometry::{compute_anchor, AffineTransform, CropGeometry, CropWindow, GeoAnchor, GroundShift};
pub use heading::{estimate_heading, flight_heading, GeometryError, RotationAngle};
pub use raster::{GeoTiffDataset, ResourceError};
pub use record::{read_records, InputError, PhotoRecord, RecordLayout, RejectedRow};
pub use srs::{SpatialReference, SpatialReferenceError};

/// A location in the projected coordinate system, in ground units.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GroundPoint {
    /// Easting
    pub x: f64,
    /// Northing
    pub y: f64,
}

impl GroundPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_point_default() {
        assert_eq!(GroundPoint::default(), GroundPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_ground_point_serialization() {
        let point = GroundPoint::new(512_300.25, 1_621_004.5);
        let text = toml::to_string(&point).unwrap();
        let parsed: GroundPoint = toml::from_str(&text).unwrap();
        assert_eq!(parsed, point);
    }
}
