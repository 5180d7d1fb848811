use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

/// Decorator that runs detection no more often than every `interval_ms`
/// of frame time.
///
/// Frames falling inside the interval get an empty result: detections are
/// never replayed or carried forward. Frames without a timestamp (stills)
/// are always detected. A timestamp earlier than the last run (a restarted
/// source) resets the schedule.
pub struct IntervalDetector {
    inner: Box<dyn FaceDetector>,
    interval_ms: u64,
    last_run_ms: Option<u64>,
    skipped: usize,
}

impl IntervalDetector {
    pub fn new(inner: Box<dyn FaceDetector>, interval_ms: u64) -> Self {
        Self {
            inner,
            interval_ms,
            last_run_ms: None,
            skipped: 0,
        }
    }

    /// Frames passed over since construction.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn is_due(&self, timestamp_ms: u64) -> bool {
        match self.last_run_ms {
            None => true,
            Some(last) if timestamp_ms < last => true,
            Some(last) => timestamp_ms - last >= self.interval_ms,
        }
    }
}

impl FaceDetector for IntervalDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let Some(ts) = frame.timestamp_ms() else {
            return self.inner.detect(frame);
        };

        if !self.is_due(ts) {
            self.skipped += 1;
            log::trace!("frame {} at {ts}ms inside detection interval", frame.index());
            return Ok(Vec::new());
        }

        self.last_run_ms = Some(ts);
        self.inner.detect(frame)
    }
}
