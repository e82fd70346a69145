//! Flight-heading estimation from consecutive photo centers.
//!
//! Photos carry no orientation of their own. The heading of the aircraft is
//! inferred from the displacement between two consecutive ground centers and
//! used as the rotation of the photo.
//!
//! # Angle Convention
//!
//! Headings are measured clockwise from grid north (+y), so a flight line
//! running due east (+x) has a heading of 90°. `atan(dx / dy)` only covers a
//! half turn, so the signs of the displacement decide which quadrant the
//! true heading lies in:
//!
//! ```text
//!            dy > 0
//!       Q4      |      Q1
//!   270°-360°   |   0°-90°
//!  -------------+------------- dx
//!       Q3      |      Q2
//!   180°-270°   |   90°-180°
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GroundPoint;

/// Errors raised while deriving a rotation from flight geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Two consecutive photos share the same center.
    #[error("zero displacement between consecutive photo centers, heading is undefined")]
    ZeroDisplacement,

    /// The displacement signs fit none of the four quadrants (NaN input).
    #[error("cannot determine flight path quadrant for displacement ({dx}, {dy})")]
    UnclassifiableQuadrant { dx: f64, dy: f64 },

    /// The sequence holds a single photo, so there is no flight line at all.
    #[error("a single photo has no flight line to derive a heading from")]
    SinglePhoto,
}

/// Quadrant of a flight-line displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    /// dx >= 0, dy > 0 (0° to 90°)
    First,
    /// dx > 0, dy <= 0 (90° to 180°)
    Second,
    /// dx <= 0, dy < 0 (180° to 270°)
    Third,
    /// dx < 0, dy >= 0 (270° to 360°)
    Fourth,
}

impl Quadrant {
    /// Offset added to the raw arctangent to land in this quadrant.
    pub fn offset(self) -> f64 {
        match self {
            Quadrant::First => 0.0,
            Quadrant::Second | Quadrant::Third => PI,
            Quadrant::Fourth => 2.0 * PI,
        }
    }
}

/// A photo rotation in radians, clockwise from grid north.
///
/// The value is not normalised to `[0, 2π)`; fourth-quadrant headings plus a
/// positive offset can exceed a full turn. Trigonometry does not care.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct RotationAngle(f64);

impl RotationAngle {
    pub fn from_radians(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

/// Classify a displacement into a quadrant.
///
/// The tests overlap on the axes and are evaluated in order Q1, Q2, Q3, Q4:
/// `(0, +dy)` is Q1, `(+dx, 0)` is Q2, `(0, -dy)` is Q3 and `(-dx, 0)` is Q4.
/// Returns `None` only when no test matches, which happens for NaN input or
/// a zero vector.
pub fn classify_quadrant(dx: f64, dy: f64) -> Option<Quadrant> {
    if dx >= 0.0 && dy > 0.0 {
        Some(Quadrant::First)
    } else if dx > 0.0 && dy <= 0.0 {
        Some(Quadrant::Second)
    } else if dx <= 0.0 && dy < 0.0 {
        Some(Quadrant::Third)
    } else if dx < 0.0 && dy >= 0.0 {
        Some(Quadrant::Fourth)
    } else {
        None
    }
}

/// Compute the heading of the flight line from `prev` to `curr`, in radians.
///
/// A pure east or west line (`dy == 0`) resolves directly to 90° or 270°.
/// Everything else goes through `atan(dx / dy)` and quadrant resolution.
///
/// # Errors
///
/// - [`GeometryError::ZeroDisplacement`] if both centers coincide
/// - [`GeometryError::UnclassifiableQuadrant`] for non-finite displacements
pub fn flight_heading(prev: GroundPoint, curr: GroundPoint) -> Result<f64, GeometryError> {
    let dx = curr.x - prev.x;
    let dy = curr.y - prev.y;

    if dx == 0.0 && dy == 0.0 {
        return Err(GeometryError::ZeroDisplacement);
    }
    if !dx.is_finite() || !dy.is_finite() {
        return Err(GeometryError::UnclassifiableQuadrant { dx, dy });
    }

    if dy == 0.0 {
        return Ok(if dx > 0.0 { PI / 2.0 } else { 3.0 * PI / 2.0 });
    }

    let raw = (dx / dy).atan();
    let quadrant =
        classify_quadrant(dx, dy).ok_or(GeometryError::UnclassifiableQuadrant { dx, dy })?;

    Ok(quadrant.offset() + raw)
}

/// Estimate the total rotation of a photo: flight heading plus the constant
/// user-configured extra rotation (degrees), added exactly once.
pub fn estimate_heading(
    prev: GroundPoint,
    curr: GroundPoint,
    extra_rotation_deg: f64,
) -> Result<RotationAngle, GeometryError> {
    let heading = flight_heading(prev, curr)?;
    Ok(RotationAngle::from_radians(
        heading + extra_rotation_deg.to_radians(),
    ))
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn heading_deg(dx: f64, dy: f64) -> f64 {
        flight_heading(GroundPoint::new(0.0, 0.0), GroundPoint::new(dx, dy))
            .unwrap()
            .to_degrees()
    }

    proptest! {
        /// Property: North-east displacements stay in the first quadrant.
        #[test]
        fn prop_first_quadrant_range(dx in 0.001f64..1e5, dy in 0.001f64..1e5) {
            let h = heading_deg(dx, dy);
            prop_assert!((0.0..90.0).contains(&h), "heading {} for ({}, {})", h, dx, dy);
        }

        /// Property: Every heading lands in [0°, 360°).
        #[test]
        fn prop_full_turn_range(dx in -1e5f64..1e5, dy in -1e5f64..1e5) {
            prop_assume!(dx != 0.0 || dy != 0.0);
            let h = heading_deg(dx, dy);
            prop_assert!((0.0..360.0 + 1e-9).contains(&h), "heading {} for ({}, {})", h, dx, dy);
        }

        /// Property: Reversing the flight direction turns the heading by 180°.
        #[test]
        fn prop_reverse_is_half_turn(dx in 0.01f64..1e4, dy in 0.01f64..1e4) {
            let forward = heading_deg(dx, dy);
            let back = heading_deg(-dx, -dy);
            prop_assert!(((back - forward) - 180.0).abs() < 1e-6);
        }

        /// Property: The heading is continuous across the east axis.
        #[test]
        fn prop_continuity_near_east_axis(eps in 1e-9f64..1e-6) {
            let above = heading_deg(1.0, eps);
            let below = heading_deg(1.0, -eps);
            prop_assert!((above - 90.0).abs() < 1e-3);
            prop_assert!((below - 90.0).abs() < 1e-3);
        }

        /// Property: The heading agrees with the compass bearing from atan2.
        #[test]
        fn prop_matches_atan2_bearing(dx in -1e4f64..1e4, dy in -1e4f64..1e4) {
            prop_assume!(dx.abs() > 1e-6 && dy.abs() > 1e-6);
            let h = heading_deg(dx, dy);
            let bearing = dx.atan2(dy).to_degrees().rem_euclid(360.0);
            prop_assert!((h - bearing).abs() < 1e-6, "{} vs {}", h, bearing);
        }
    }
}
