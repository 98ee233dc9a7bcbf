//! Pure calculation functions for rendition geometry.
//!
//! All functions here are pure and testable without any I/O or images. The
//! rounding rules are part of the contract: renditions must be bit-for-bit
//! reproducible for a given source size, target size and point of interest.
//!
//! - Width/height conversions round half up (`+ 0.5`, then truncate).
//! - The focus pixel truncates the fractional coordinate.
//! - Half-width offsets use integer division.

use crate::types::Ppoi;

/// A crop window in source pixel space, `left`/`top` inclusive,
/// `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Truncate a fractional coordinate to the source pixel it falls on.
///
/// # Examples
/// ```
/// # use renditions::imaging::focus_pixel;
/// # use renditions::Ppoi;
/// let ppoi = Ppoi::new(0.5, 0.25).unwrap();
/// assert_eq!(focus_pixel((1000, 500), ppoi), (500, 125));
/// ```
pub fn focus_pixel(source: (u32, u32), ppoi: Ppoi) -> (i64, i64) {
    let (src_w, src_h) = source;
    (
        (ppoi.x() * src_w as f64) as i64,
        (ppoi.y() * src_h as f64) as i64,
    )
}

/// Place a window of `length` centered on `center` inside `[0, bound]`.
///
/// The window is shifted, never shrunk, when it would leave the bounds.
fn centered_span(center: i64, length: i64, bound: i64) -> (i64, i64) {
    let mut start = center - length / 2;
    let mut end = start + length;
    if start < 0 {
        start = 0;
        end = length;
    } else if end > bound {
        end = bound;
        start = bound - length;
    }
    (start, end)
}

/// Calculate the crop window for a point-of-interest crop.
///
/// The window has the target aspect ratio and keeps the full extent of the
/// source along the axis that is relatively shorter. Along the other axis it
/// is centered on the focus pixel and shifted back inside the image when it
/// would overflow.
///
/// # Arguments
/// * `source` - Source image dimensions (width, height)
/// * `target` - Final rendition dimensions (width, height)
/// * `ppoi` - Point of interest as fractions of the source
///
/// # Examples
/// ```
/// # use renditions::imaging::{crop_box, CropBox};
/// # use renditions::Ppoi;
/// let b = crop_box((1000, 500), (200, 200), Ppoi::new(0.5, 0.5).unwrap());
/// assert_eq!(b, CropBox { left: 250, top: 0, right: 750, bottom: 500 });
/// ```
pub fn crop_box(source: (u32, u32), target: (u32, u32), ppoi: Ppoi) -> CropBox {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let (focus_x, focus_y) = focus_pixel(source, ppoi);

    let orig_aspect = src_w as f64 / src_h as f64;
    let target_aspect = tgt_w as f64 / tgt_h as f64;

    let (left, top, right, bottom) = if orig_aspect >= target_aspect {
        // Source is relatively wider: keep full height, trim left/right
        let crop_w = ((target_aspect * src_h as f64) + 0.5) as i64;
        let (left, right) = centered_span(focus_x, crop_w, src_w as i64);
        (left, 0, right, src_h as i64)
    } else {
        // Source is relatively taller: keep full width, trim top/bottom
        let crop_h = ((src_w as f64 / target_aspect) + 0.5) as i64;
        let (top, bottom) = centered_span(focus_y, crop_h, src_h as i64);
        (0, top, src_w as i64, bottom)
    };

    CropBox {
        left: left as u32,
        top: top as u32,
        right: right as u32,
        bottom: bottom as u32,
    }
}

/// Calculate dimensions that fit inside a bounding box, preserving aspect ratio.
///
/// Images that already fit are returned unchanged (never upscaled). Each
/// computed edge is rounded half up and is at least one pixel.
///
/// # Examples
/// ```
/// # use renditions::imaging::fit_within;
/// assert_eq!(fit_within((1000, 500), (300, 300)), (300, 150));
/// assert_eq!(fit_within((100, 50), (300, 300)), (100, 50));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let bounds_aspect = max_w as f64 / max_h as f64;

    if src_aspect >= bounds_aspect {
        // Width is the constraining edge
        let h = ((max_w as f64 / src_aspect) + 0.5) as u32;
        (max_w, h.max(1))
    } else {
        let w = ((max_h as f64 * src_aspect) + 0.5) as u32;
        (w.max(1), max_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ppoi(x: f64, y: f64) -> Ppoi {
        Ppoi::new(x, y).unwrap()
    }

    // =========================================================================
    // crop_box tests
    // =========================================================================

    #[test]
    fn crop_wide_source_centered() {
        // 2.0 >= 1.0: crop width = round(1.0 * 500) = 500, focus x = 500
        let b = crop_box((1000, 500), (200, 200), ppoi(0.5, 0.5));
        assert_eq!(
            b,
            CropBox {
                left: 250,
                top: 0,
                right: 750,
                bottom: 500
            }
        );
    }

    #[test]
    fn crop_wide_source_shifts_at_left_edge() {
        // focus x = 10, left = 10 - 250 = -240 → shifted to 0..500
        let b = crop_box((1000, 500), (200, 200), ppoi(0.01, 0.5));
        assert_eq!((b.left, b.right), (0, 500));
        assert_eq!((b.top, b.bottom), (0, 500));
    }

    #[test]
    fn crop_wide_source_shifts_at_right_edge() {
        // focus x = 990, right = 740 + 500 = 1240 → shifted to 500..1000
        let b = crop_box((1000, 500), (200, 200), ppoi(0.99, 0.5));
        assert_eq!((b.left, b.right), (500, 1000));
    }

    #[test]
    fn crop_tall_source_centered_on_focus() {
        // 0.5 < 2.0: crop height = round(500 / 2.0) = 250, focus y = 300
        let b = crop_box((500, 1000), (200, 100), ppoi(0.5, 0.3));
        assert_eq!(
            b,
            CropBox {
                left: 0,
                top: 175,
                right: 500,
                bottom: 425
            }
        );
    }

    #[test]
    fn crop_tall_source_shifts_at_bottom_edge() {
        let b = crop_box((500, 1000), (200, 100), ppoi(0.5, 1.0));
        assert_eq!((b.top, b.bottom), (750, 1000));
        assert_eq!(b.height(), 250);
    }

    #[test]
    fn crop_same_aspect_keeps_everything() {
        let b = crop_box((800, 600), (400, 300), ppoi(0.9, 0.1));
        assert_eq!(
            b,
            CropBox {
                left: 0,
                top: 0,
                right: 800,
                bottom: 600
            }
        );
    }

    #[test]
    fn crop_width_rounds_half_up() {
        // 3:2 target on 101px height: 1.5 * 101 = 151.5 → 152
        let b = crop_box((400, 101), (3, 2), ppoi(0.5, 0.5));
        assert_eq!(b.width(), 152);
        // focus x = 200, left = 200 - 76 = 124
        assert_eq!((b.left, b.right), (124, 276));
    }

    #[test]
    fn crop_odd_width_offset_uses_integer_division() {
        // crop width = round(1.0 * 301) = 301, focus x = 300, left = 300 - 150
        let b = crop_box((1000, 301), (1, 1), ppoi(0.3, 0.0));
        assert_eq!((b.left, b.right), (150, 451));
    }

    #[test]
    fn crop_is_deterministic() {
        let a = crop_box((1234, 567), (300, 200), ppoi(0.37, 0.81));
        let b = crop_box((1234, 567), (300, 200), ppoi(0.37, 0.81));
        assert_eq!(a, b);
    }

    #[test]
    fn focus_pixel_truncates() {
        assert_eq!(focus_pixel((999, 333), ppoi(0.5, 0.5)), (499, 166));
        assert_eq!(focus_pixel((1000, 500), ppoi(1.0, 0.0)), (1000, 0));
    }

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within((1000, 500), (300, 300)), (300, 150));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within((500, 1000), (300, 300)), (150, 300));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within((120, 80), (300, 300)), (120, 80));
    }

    #[test]
    fn fit_only_one_edge_too_large() {
        assert_eq!(fit_within((400, 100), (300, 300)), (300, 75));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((10000, 1), (100, 100)), (100, 1));
    }

    #[test]
    fn crop_extreme_aspect_rounds_to_empty_window() {
        let b = crop_box((1000, 1), (1, 1000), Ppoi::CENTER);
        assert_eq!(b.width(), 0);
        assert_eq!(b.height(), 1);
    }
}
