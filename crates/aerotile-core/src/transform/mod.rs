//! Pixel transforms applied to each photo before it is written.
//!
//! # Transform Order
//!
//! 1. Crop the fixed-size window from the center of the photo
//! 2. Rotate clockwise by the photo's total rotation (canvas expands)
//!
//! The rotation is baked into the pixels; the georeferencing transform of
//! the written raster stays axis-aligned.

mod crop;
mod rotation;

pub use crop::crop_centered;
pub use rotation::{compute_rotated_bounds, rotate_clockwise, InterpolationFilter};
