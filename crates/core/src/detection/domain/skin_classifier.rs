//! Per-pixel skin-tone test and window density sampling.

use crate::shared::frame::Frame;

/// Heuristic skin-tone region of RGB space.
///
/// The `|r - g| > 15` and `r - g > 15` terms are equivalent once `r > g`
/// holds; both are kept so the rule reads exactly as tuned.
pub fn is_skin_color(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    r > 95 && g > 40 && b > 20 && r > g && r > b && (r - g).abs() > 15 && (r - g) > 15
}

/// True when the fraction of skin pixels sampled from the `size × size`
/// window at `(x, y)` exceeds `threshold`.
///
/// Samples every `stride` pixels on both axes, clipped to the frame. A window
/// with no sampled pixels (entirely off-frame) is never skin.
pub fn is_skin_region(frame: &Frame, x: u32, y: u32, size: u32, threshold: f64, stride: u32) -> bool {
    skin_ratio(frame, x, y, size, stride).is_some_and(|ratio| ratio > threshold)
}

/// Skin-pixel ratio of the sampled window, `None` if nothing was sampled.
pub fn skin_ratio(frame: &Frame, x: u32, y: u32, size: u32, stride: u32) -> Option<f64> {
    let stride = stride.max(1) as usize;
    let (width, height) = (frame.width(), frame.height());

    let mut skin = 0usize;
    let mut total = 0usize;

    for dy in (0..size).step_by(stride) {
        let py = y as u64 + dy as u64;
        if py >= height as u64 {
            break;
        }
        for dx in (0..size).step_by(stride) {
            let px = x as u64 + dx as u64;
            if px >= width as u64 {
                break;
            }
            let (r, g, b) = frame.pixel(px as u32, py as u32);
            if is_skin_color(r, g, b) {
                skin += 1;
            }
            total += 1;
        }
    }

    if total == 0 {
        None
    } else {
        Some(skin as f64 / total as f64)
    }
}
