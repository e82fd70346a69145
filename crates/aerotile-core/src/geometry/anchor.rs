//! Rotated bounding box and affine transform for one photo.
//!
//! The crop window is rotated by the photo's total rotation around its ground
//! center. Only the upper-right (A) and lower-right (B) corners are computed;
//! the other two corners are their negations, so the axis-aligned bounding
//! box is the min/max over `±A` and `±B`. That construction keeps the box
//! symmetric about the (shifted) center for any rotation.

use serde::{Deserialize, Serialize};

use super::{AffineTransform, CropGeometry};
use crate::heading::RotationAngle;
use crate::GroundPoint;

/// Constant ground offset applied to every photo, in the photo's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundShift {
    pub x: f64,
    pub y: f64,
}

impl GroundShift {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate the shift into the ground frame of a photo.
    pub fn rotated(&self, rotation: RotationAngle) -> GroundShift {
        let (sin, cos) = rotation.radians().sin_cos();
        GroundShift {
            x: cos * self.y + sin * self.x,
            y: cos * self.x - sin * self.y,
        }
    }
}

/// Georeferencing result for one photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoAnchor {
    /// Upper-right corner offset after rotation, in ground units.
    pub corner_a: GroundPoint,
    /// Lower-right corner offset after rotation, in ground units.
    pub corner_b: GroundPoint,
    /// The configured ground shift rotated into the photo frame.
    pub shift: GroundShift,
    pub upper_left: GroundPoint,
    pub lower_right: GroundPoint,
}

impl GeoAnchor {
    /// Ground extent of the bounding box as (width, height).
    pub fn extent(&self) -> (f64, f64) {
        (
            self.lower_right.x - self.upper_left.x,
            self.upper_left.y - self.lower_right.y,
        )
    }

    /// Midpoint of the bounding box.
    pub fn midpoint(&self) -> GroundPoint {
        GroundPoint::new(
            (self.upper_left.x + self.lower_right.x) / 2.0,
            (self.upper_left.y + self.lower_right.y) / 2.0,
        )
    }

    /// Affine transform mapping a raster of the given pixel size onto the box.
    ///
    /// The transform carries no rotation terms; rotation lives in the pixel
    /// content of the rotated raster.
    ///
    /// # Arguments
    ///
    /// * `raster_width`, `raster_height` - Size of the written raster in pixels
    ///
    /// # Returns
    ///
    /// A north-up transform whose origin is `upper_left` and whose pixel
    /// (`raster_width`, `raster_height`) lands on `lower_right`.
    pub fn transform(&self, raster_width: u32, raster_height: u32) -> AffineTransform {
        let pixel_width = (self.lower_right.x - self.upper_left.x) / raster_width as f64;
        let pixel_height = (self.lower_right.y - self.upper_left.y) / raster_height as f64;
        AffineTransform::north_up(
            self.upper_left.x,
            self.upper_left.y,
            pixel_width,
            pixel_height,
        )
    }
}

fn min4(a: f64, b: f64, c: f64, d: f64) -> f64 {
    a.min(b).min(c).min(d)
}

fn max4(a: f64, b: f64, c: f64, d: f64) -> f64 {
    a.max(b).max(c).max(d)
}

/// Compute the ground anchor of a photo.
///
/// The function is pure: identical inputs give bit-identical outputs.
///
/// # Arguments
///
/// * `center` - Photo center in ground coordinates
/// * `rotation` - Total rotation (heading plus configured offset)
/// * `geometry` - Crop window geometry at the photo's resolution
/// * `shift` - Ground shift in the photo's own frame
///
/// # Returns
///
/// The rotated corner offsets and the bounding box of the rotated window,
/// translated by the center and the rotated shift.
///
/// # Example
///
/// ```ignore
/// let geom = CropGeometry::new(CropWindow::new(15, 10), 16.0);
/// let east = RotationAngle::from_degrees(90.0);
/// let anchor = compute_anchor(GroundPoint::new(100.0, 0.0), east, &geom, GroundShift::default());
/// // Heading east: the 240 m x 160 m window lies on its side.
/// assert_eq!(anchor.extent(), (160.0, 240.0));
/// ```
pub fn compute_anchor(
    center: GroundPoint,
    rotation: RotationAngle,
    geometry: &CropGeometry,
    shift: GroundShift,
) -> GeoAnchor {
    let theta = rotation.radians();
    let diagonal = geometry.diagonal;

    let (sin_a, cos_a) = (geometry.angle_a + theta).sin_cos();
    let (sin_b, cos_b) = (geometry.angle_b + theta).sin_cos();
    let (ax, ay) = (diagonal * sin_a, diagonal * cos_a);
    let (bx, by) = (diagonal * sin_b, diagonal * cos_b);

    let shift = shift.rotated(rotation);

    let upper_left = GroundPoint::new(
        center.x + min4(ax, bx, -ax, -bx) + shift.x,
        center.y + max4(ay, by, -ay, -by) + shift.y,
    );
    let lower_right = GroundPoint::new(
        center.x + max4(ax, bx, -ax, -bx) + shift.x,
        center.y + min4(ay, by, -ay, -by) + shift.y,
    );

    GeoAnchor {
        corner_a: GroundPoint::new(ax, ay),
        corner_b: GroundPoint::new(bx, by),
        shift,
        upper_left,
        lower_right,
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::CropWindow;
    use proptest::prelude::*;

    fn geometry_strategy() -> impl Strategy<Value = CropGeometry> {
        (1u32..=4000, 1u32..=4000, 0.01f64..=2.0)
            .prop_map(|(w, h, res)| CropGeometry::new(CropWindow::new(w, h), res))
    }

    proptest! {
        /// Property: The box midpoint is the center plus the rotated shift.
        #[test]
        fn prop_box_symmetric_about_center(
            geom in geometry_strategy(),
            cx in -1e6f64..1e6,
            cy in -1e6f64..1e7,
            degrees in 0.0f64..720.0,
            sx in -100.0f64..100.0,
            sy in -100.0f64..100.0,
        ) {
            let rotation = RotationAngle::from_degrees(degrees);
            let shift = GroundShift::new(sx, sy);
            let anchor = compute_anchor(GroundPoint::new(cx, cy), rotation, &geom, shift);

            let rotated = shift.rotated(rotation);
            let mid = anchor.midpoint();
            prop_assert!((mid.x - (cx + rotated.x)).abs() < 1e-6);
            prop_assert!((mid.y - (cy + rotated.y)).abs() < 1e-6);
        }

        /// Property: The upper-left corner is never right of or below the lower-right.
        #[test]
        fn prop_box_is_ordered(geom in geometry_strategy(), degrees in -360.0f64..360.0) {
            let anchor = compute_anchor(
                GroundPoint::new(0.0, 0.0),
                RotationAngle::from_degrees(degrees),
                &geom,
                GroundShift::default(),
            );
            prop_assert!(anchor.upper_left.x <= anchor.lower_right.x);
            prop_assert!(anchor.upper_left.y >= anchor.lower_right.y);
        }

        /// Property: The box always contains the unrotated window's inscribed extent.
        #[test]
        fn prop_box_covers_window(geom in geometry_strategy(), degrees in 0.0f64..360.0) {
            let anchor = compute_anchor(
                GroundPoint::new(0.0, 0.0),
                RotationAngle::from_degrees(degrees),
                &geom,
                GroundShift::default(),
            );
            let (width, height) = anchor.extent();
            let short_side = 2.0 * geom.half_width.min(geom.half_height);
            prop_assert!(width + 1e-6 >= short_side);
            prop_assert!(height + 1e-6 >= short_side);
            prop_assert!(width <= 2.0 * geom.diagonal + 1e-6);
            prop_assert!(height <= 2.0 * geom.diagonal + 1e-6);
        }

        /// Property: Half-turn rotations produce the same box.
        #[test]
        fn prop_half_turn_invariant(geom in geometry_strategy(), degrees in 0.0f64..180.0) {
            let center = GroundPoint::new(10.0, 20.0);
            let a = compute_anchor(center, RotationAngle::from_degrees(degrees), &geom, GroundShift::default());
            let b = compute_anchor(center, RotationAngle::from_degrees(degrees + 180.0), &geom, GroundShift::default());
            prop_assert!((a.upper_left.x - b.upper_left.x).abs() < 1e-6);
            prop_assert!((a.upper_left.y - b.upper_left.y).abs() < 1e-6);
        }

        /// Property: Pixel (0,0) maps to upper-left and (w,h) to lower-right.
        #[test]
        fn prop_transform_round_trip(
            geom in geometry_strategy(),
            degrees in 0.0f64..360.0,
            raster_w in 1u32..5000,
            raster_h in 1u32..5000,
        ) {
            let anchor = compute_anchor(
                GroundPoint::new(400_000.0, 1_600_000.0),
                RotationAngle::from_degrees(degrees),
                &geom,
                GroundShift::default(),
            );
            let transform = anchor.transform(raster_w, raster_h);

            let (x0, y0) = transform.apply(0.0, 0.0);
            prop_assert_eq!(x0, anchor.upper_left.x);
            prop_assert_eq!(y0, anchor.upper_left.y);

            let (x1, y1) = transform.apply(raster_w as f64, raster_h as f64);
            prop_assert!((x1 - anchor.lower_right.x).abs() < 1e-6);
            prop_assert!((y1 - anchor.lower_right.y).abs() < 1e-6);
        }
    }
}
