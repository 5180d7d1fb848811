use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::randomness::{Clock, RandomSource};
use crate::detection::domain::region_grower::find_face_bounds;
use crate::detection::domain::skin_classifier::is_skin_region;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{CONFIDENCE_FLOOR, CONFIDENCE_SPAN};
use crate::shared::frame::Frame;

/// Walks the seed grid and returns the final, expanded face boxes.
///
/// Seeds are visited row by row (y outer, x inner) over
/// `[0, w - min_face_size) × [0, h - min_face_size)`. A grown box smaller
/// than `min_face_size` on either side is dropped, as is one that an
/// already-accepted box overlaps; the earliest seed therefore wins. Accepted
/// boxes are stored expanded, and later candidates are compared against
/// those expanded boxes.
pub fn scan_candidates(frame: &Frame, config: &DetectionConfig) -> Vec<BoundingBox> {
    if frame.is_empty() {
        return Vec::new();
    }

    let (width, height) = (frame.width(), frame.height());
    let min_size = config.min_face_size;
    let step = config.scan_step_size.max(1) as usize;

    let mut accepted: Vec<BoundingBox> = Vec::new();
    let mut seeds = 0usize;

    for y in (0..height.saturating_sub(min_size)).step_by(step) {
        for x in (0..width.saturating_sub(min_size)).step_by(step) {
            if !is_skin_region(frame, x, y, min_size, config.skin_threshold, config.sample_stride) {
                continue;
            }
            seeds += 1;

            let Some(bounds) = find_face_bounds(frame, x, y, config.max_face_size) else {
                continue;
            };
            if bounds.width < min_size as i32 || bounds.height < min_size as i32 {
                continue;
            }
            if accepted.iter().any(|a| a.overlaps(&bounds)) {
                continue;
            }
            accepted.push(bounds.expand(width, height, config.expand_factor));
        }
    }

    log::debug!(
        "frame {}: {seeds} skin seeds, {} faces",
        frame.index(),
        accepted.len()
    );
    accepted
}

/// Runs [`scan_candidates`] and wraps each box as a [`DetectedFace`] with a
/// fresh id, timestamp and simulated confidence.
pub fn detect_faces_with(
    frame: &Frame,
    config: &DetectionConfig,
    rng: &mut dyn RandomSource,
    clock: &dyn Clock,
) -> Vec<DetectedFace> {
    scan_candidates(frame, config)
        .into_iter()
        .map(|bounding_box| {
            let id_fraction = rng.next_fraction();
            let confidence = CONFIDENCE_FLOOR + CONFIDENCE_SPAN * rng.next_fraction();
            DetectedFace::new(clock.now(), id_fraction, bounding_box, confidence)
        })
        .collect()
}
