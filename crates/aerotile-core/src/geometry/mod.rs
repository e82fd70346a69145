//! Corner geometry: from a rotation and a crop window to ground coordinates.
//!
//! # Coordinate System
//!
//! - Ground coordinates are in the projected system's linear unit (meters)
//! - x grows east, y grows north
//! - Rotations are clockwise from north, in radians
//! - Raster pixel (0, 0) is the upper-left corner, rows grow southwards

mod affine;
mod anchor;
mod crop_window;

pub use affine::AffineTransform;
pub use anchor::{compute_anchor, GeoAnchor, GroundShift};
pub use crop_window::{CropGeometry, CropWindow};
