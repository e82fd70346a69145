//! Crop window dimensions and their ground-unit geometry.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Fixed-size crop rectangle in pixels, shared by every photo of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether an image of the given size holds the whole window.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width <= width && self.height <= height
    }
}

/// Ground-unit geometry of a crop window at one resolution.
///
/// The window is described by the half-diagonal and the angles from
/// heading zero (north) to its upper-right (`angle_a`) and lower-right
/// (`angle_b`) corners. The two remaining corners are the negations of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    pub window: CropWindow,
    /// Ground sample resolution, meters per pixel.
    pub resolution: f64,
    pub half_width: f64,
    pub half_height: f64,
    pub diagonal: f64,
    pub angle_a: f64,
    pub angle_b: f64,
}

impl CropGeometry {
    /// Precompute the window geometry for one resolution.
    ///
    /// Recomputed per photo because the resolution may vary between records.
    ///
    /// # Arguments
    ///
    /// * `window` - Crop size in pixels
    /// * `resolution` - Ground sample distance, meters per pixel
    ///
    /// # Example
    ///
    /// ```ignore
    /// let geom = CropGeometry::new(CropWindow::new(1500, 1000), 0.16);
    /// assert_eq!((geom.half_width, geom.half_height), (120.0, 80.0));
    /// ```
    pub fn new(window: CropWindow, resolution: f64) -> Self {
        let half_width = (window.width as f64 / 2.0) * resolution;
        let half_height = (window.height as f64 / 2.0) * resolution;

        let diagonal = (half_width * half_width + half_height * half_height).sqrt();
        let angle_a = (half_width / half_height).atan();
        let angle_b = PI - angle_a;

        Self {
            window,
            resolution,
            half_width,
            half_height,
            diagonal,
            angle_a,
            angle_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_window() {
        let geom = CropGeometry::new(CropWindow::new(1500, 1000), 0.16);

        assert!((geom.half_width - 120.0).abs() < 1e-9);
        assert!((geom.half_height - 80.0).abs() < 1e-9);
        assert!((geom.diagonal - (120.0f64.powi(2) + 80.0f64.powi(2)).sqrt()).abs() < 1e-9);
        assert!((geom.angle_a - (1.5f64).atan()).abs() < 1e-12);
        assert!((geom.angle_a + geom.angle_b - PI).abs() < 1e-12);
    }

    #[test]
    fn test_square_window_angles() {
        let geom = CropGeometry::new(CropWindow::new(100, 100), 1.0);

        assert!((geom.angle_a.to_degrees() - 45.0).abs() < 1e-9);
        assert!((geom.angle_b.to_degrees() - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window() {
        assert!(CropWindow::new(0, 10).is_empty());
        assert!(!CropWindow::new(1, 1).is_empty());
    }

    #[test]
    fn test_fits_within() {
        let window = CropWindow::new(1500, 1000);
        assert!(window.fits_within(1500, 1000));
        assert!(window.fits_within(4000, 3000));
        assert!(!window.fits_within(1499, 3000));
        assert!(!window.fits_within(4000, 999));
    }
}
