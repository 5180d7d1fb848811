use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Presentation time of frame `index`, or `None` for still images.
    pub fn timestamp_ms(&self, index: usize) -> Option<u64> {
        if self.fps > 0.0 {
            Some((index as f64 * 1000.0 / self.fps).round() as u64)
        } else {
            None
        }
    }
}
