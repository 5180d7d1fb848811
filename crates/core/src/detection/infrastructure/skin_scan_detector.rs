use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::frame_scanner::detect_faces_with;
use crate::detection::domain::randomness::{Clock, RandomSource};
use crate::detection::infrastructure::system_entropy::{SystemClock, UuidRandomSource};
use crate::shared::frame::Frame;

/// Skin-tone grid scan behind the [`FaceDetector`] port.
///
/// Owns its config and entropy so callers can swap in deterministic
/// sources; the scan itself keeps no state between frames.
pub struct SkinScanDetector {
    config: DetectionConfig,
    rng: Box<dyn RandomSource>,
    clock: Box<dyn Clock>,
}

impl SkinScanDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_sources(config, Box::new(UuidRandomSource), Box::new(SystemClock))
    }

    pub fn with_sources(
        config: DetectionConfig,
        rng: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self { config, rng, clock }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

impl FaceDetector for SkinScanDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        Ok(detect_faces_with(
            frame,
            &self.config,
            self.rng.as_mut(),
            self.clock.as_ref(),
        ))
    }
}

/// One-shot detection with production entropy and the wall clock.
pub fn detect_faces(frame: &Frame, config: &DetectionConfig) -> Vec<DetectedFace> {
    detect_faces_with(frame, config, &mut UuidRandomSource, &SystemClock)
}
