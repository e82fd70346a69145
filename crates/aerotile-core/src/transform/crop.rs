//! Center-anchored cropping to a fixed pixel window.
//!
//! The crop window keeps its size for every photo of a flight, and is taken
//! from the middle of the frame where lens falloff is smallest. When the
//! source is smaller than the window along an axis, the full extent of that
//! axis is kept.

use image::RgbImage;

use crate::geometry::CropWindow;

/// Crop the central `window.width` x `window.height` pixels of an image.
///
/// # Behavior
///
/// - The window is centered; odd leftovers go to the right/bottom edge
/// - Axes smaller than the window are kept whole (no padding)
/// - A window matching the source returns a copy
///
/// # Example
///
/// ```ignore
/// let photo = RgbImage::new(4000, 3000);
/// let cropped = crop_centered(&photo, CropWindow::new(1500, 1000));
/// assert_eq!(cropped.dimensions(), (1500, 1000));
/// ```
pub fn crop_centered(image: &RgbImage, window: CropWindow) -> RgbImage {
    let (src_w, src_h) = image.dimensions();

    let out_w = window.width.min(src_w).max(1);
    let out_h = window.height.min(src_h).max(1);

    // Fast path: nothing to crop
    if out_w == src_w && out_h == src_h {
        return image.clone();
    }

    let left = (src_w - out_w) / 2;
    let top = (src_h - out_h) / 2;

    image::imageops::crop_imm(image, left, top, out_w, out_h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Create a test image where each pixel has a unique value based on position.
    fn test_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((y * width + x) % 256) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_full_crop() {
        let img = test_image(100, 100);
        let result = crop_centered(&img, CropWindow::new(100, 100));

        assert_eq!(result.dimensions(), (100, 100));
        assert_eq!(result.as_raw(), img.as_raw());
    }

    #[test]
    fn test_center_crop() {
        let img = test_image(10, 10);
        let result = crop_centered(&img, CropWindow::new(6, 6));

        assert_eq!(result.dimensions(), (6, 6));

        // First pixel should be from position (2, 2) in the source
        // Value at (2, 2) = (2 * 10 + 2) % 256 = 22
        assert_eq!(result.get_pixel(0, 0)[0], 22);
    }

    #[test]
    fn test_odd_leftover_goes_right() {
        let img = test_image(11, 11);
        let result = crop_centered(&img, CropWindow::new(4, 4));

        // (11 - 4) / 2 = 3
        assert_eq!(result.get_pixel(0, 0)[0], (3 * 11 + 3) as u8);
    }

    #[test]
    fn test_crop_rectangular() {
        let img = test_image(200, 100);
        let result = crop_centered(&img, CropWindow::new(150, 50));

        assert_eq!(result.dimensions(), (150, 50));
        // Origin at (25, 25)
        assert_eq!(result.get_pixel(0, 0)[0], ((25 * 200 + 25) % 256) as u8);
    }

    #[test]
    fn test_window_larger_than_source() {
        let img = test_image(40, 30);
        let result = crop_centered(&img, CropWindow::new(1500, 1000));

        assert_eq!(result.dimensions(), (40, 30));
    }

    #[test]
    fn test_window_larger_on_one_axis() {
        let img = test_image(40, 30);
        let result = crop_centered(&img, CropWindow::new(20, 1000));

        assert_eq!(result.dimensions(), (20, 30));
        assert_eq!(result.get_pixel(0, 0)[0], 10);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
