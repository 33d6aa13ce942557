//! Pure border and padding calculations.
//!
//! All functions here work in `f64` and are testable without any I/O or
//! pixel data. Dimensions are truncated to whole pixels only at the point
//! where they are consumed by the image codec (see
//! [`decorate`](super::decorate)), so the aspect-ratio guarantee below holds
//! to floating-point precision.
//!
//! The border model is anchored to a physical print: a 5 mm border on a
//! print whose longer side is 130 mm. That ratio, scaled by the longer side
//! of the actual image and an optional multiplier, gives the minimum border.
//! Whatever extra padding is needed to reach the target aspect ratio is then
//! added to exactly one axis.

use crate::config::Corner;

/// Fraction of a single border band covered by text height.
pub const TEXT_RATIO: f64 = 0.7;

/// Longer side of the reference print, in millimeters.
const NOMINAL_LONG_SIDE_MM: f64 = 130.0;

/// Border width on each side of the reference print, in millimeters.
const BASE_BORDER_WIDTH_MM: f64 = 5.0;

/// Aspect ratio with portrait and landscape treated uniformly: always >= 1.
pub fn normalized_aspect_ratio(dims: (u32, u32)) -> f64 {
    let ratio = dims.0 as f64 / dims.1 as f64;
    if ratio >= 1.0 { ratio } else { 1.0 / ratio }
}

/// Minimum total border (the sum over both sides) per axis.
///
/// The minimum border is isotropic: both axes get the same value, derived
/// from the longer image side so the printed border width is independent of
/// orientation.
pub fn minimal_border(dims: (u32, u32), multiplier: f64) -> (f64, f64) {
    // Factor 2: the returned value covers the border on both sides.
    let ratio = (2.0 * BASE_BORDER_WIDTH_MM * multiplier) / NOMINAL_LONG_SIDE_MM;
    let border = ratio * (dims.0 as f64).max(dims.1 as f64);
    (border, border)
}

/// Total border per axis such that `(w + bx) / (h + by)` equals
/// `target_ratio`.
///
/// Starting from the minimum border, exactly one axis receives extra
/// padding: the height axis when the minimum-padded image is wider than the
/// target, the width axis otherwise. A minimum-padded image that already
/// matches the target falls through to the width branch with zero extra.
pub fn border_dimensions(dims: (u32, u32), target_ratio: f64, multiplier: f64) -> (f64, f64) {
    let (min_bx, min_by) = minimal_border(dims, multiplier);
    let min_w = dims.0 as f64 + min_bx;
    let min_h = dims.1 as f64 + min_by;
    let current_ratio = min_w / min_h;

    if current_ratio > target_ratio {
        // Wider than target: pad the height axis.
        let padded_h = min_w / target_ratio;
        (min_bx, min_by + (padded_h - min_h))
    } else {
        // Taller than (or equal to) target: pad the width axis.
        let padded_w = min_h * target_ratio;
        (min_bx + (padded_w - min_w), min_by)
    }
}

/// Final canvas size for an image decorated with its border.
pub fn padded_dimensions(dims: (u32, u32), target_ratio: f64, multiplier: f64) -> (f64, f64) {
    let (bx, by) = border_dimensions(dims, target_ratio, multiplier);
    (dims.0 as f64 + bx, dims.1 as f64 + by)
}

/// Font size for border text, in pixels.
///
/// Half of the smaller total border (the border value covers both sides),
/// scaled by [`TEXT_RATIO`].
pub fn font_size(dims: (u32, u32), target_ratio: f64, multiplier: f64) -> u32 {
    let (bx, by) = border_dimensions(dims, target_ratio, multiplier);
    ((bx.min(by) / 2.0) * TEXT_RATIO) as u32
}

/// Anchor point for the text block at `corner`, in canvas coordinates.
///
/// The anchor is the bottom-left of the block for left corners and the
/// bottom-right for right corners; the caller aligns accordingly. Text sits
/// inset from the canvas edge by the slack left between the single-side
/// border and the font size.
pub fn text_origin(corner: Corner, dims: (u32, u32), target_ratio: f64, multiplier: f64) -> (f64, f64) {
    let font = font_size(dims, target_ratio, multiplier) as f64;
    let (bx, by) = border_dimensions(dims, target_ratio, multiplier);
    let (single_bx, single_by) = (bx / 2.0, by / 2.0);
    let inset = (single_bx.min(single_by) - font) / 2.0;
    let (w, h) = (dims.0 as f64, dims.1 as f64);

    match corner {
        Corner::TopLeft => (single_bx + inset, single_by - inset),
        Corner::TopRight => (single_bx + w - inset, single_by - inset),
        Corner::BottomLeft => (single_bx + inset, 2.0 * single_by + h - inset),
        Corner::BottomRight => (single_bx + w - inset, 2.0 * single_by + h - inset),
    }
}
