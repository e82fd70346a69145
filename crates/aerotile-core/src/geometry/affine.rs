//! Six-coefficient affine transform from pixel space to ground space.

use serde::{Deserialize, Serialize};

/// Affine transformation values.
///
/// Coefficients follow the `(a, b, c, d, e, f)` layout:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform(f64, f64, f64, f64, f64, f64);

impl AffineTransform {
    pub fn new(a: f64, b: f64, xoff: f64, d: f64, e: f64, yoff: f64) -> Self {
        Self(a, b, xoff, d, e, yoff)
    }

    /// Axis-aligned transform with an upper-left origin and per-axis pixel size.
    ///
    /// # Arguments
    ///
    /// * `origin_x`, `origin_y` - Ground position of the raster's upper-left corner
    /// * `pixel_width` - Ground width of one column
    /// * `pixel_height` - Ground height of one row, normally negative for
    ///   north-up rasters
    ///
    /// # Example
    ///
    /// ```ignore
    /// let t = AffineTransform::north_up(20.0, 120.0, 16.0, -16.0);
    /// assert_eq!(t.apply(10.0, 15.0), (180.0, -120.0));
    /// ```
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, pixel_height, origin_y)
    }

    /// Build from the GDAL geotransform ordering
    /// `[c, a, b, f, d, e]` (origin x, x scale, row shear, origin y, col shear, y scale).
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// Export in GDAL geotransform ordering.
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.2, self.0, self.1, self.5, self.3, self.4]
    }

    pub fn a(&self) -> f64 {
        self.0
    }

    pub fn b(&self) -> f64 {
        self.1
    }

    pub fn c(&self) -> f64 {
        self.2
    }

    pub fn d(&self) -> f64 {
        self.3
    }

    pub fn e(&self) -> f64 {
        self.4
    }

    pub fn f(&self) -> f64 {
        self.5
    }

    /// True when the transform has no rotation or shear terms.
    pub fn is_axis_aligned(&self) -> bool {
        self.1 == 0.0 && self.3 == 0.0
    }

    /// Map a pixel position (column, row) to ground coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.0 * col + self.1 * row + self.2,
            self.3 * col + self.4 * row + self.5,
        )
    }

    /// GeoTIFF `ModelPixelScaleTag` payload: positive sizes, y measured southwards.
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.0, -self.4, 0.0]
    }

    /// GeoTIFF `ModelTiepointTag` payload tying raster (0, 0) to the origin.
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.2, self.5, 0.0]
    }
}
