use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::face_compositor::LabelFont;
use crate::pipeline::face_gallery::FaceGallery;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::scan_faces_use_case::{
    elapsed_ms, report_progress, store_faces, Annotation, ProgressCallback,
};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

const QUEUE_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// What the reader does with a frame that arrives while the detector
/// queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Block the reader until the detector catches up; every frame is scanned.
    #[default]
    Queue,
    /// Drop the frame; the detector only ever sees the frames it has time for.
    Skip,
}

/// Runs a scan with the reader and detector on dedicated threads.
///
/// Layout: `reader → detect → main [composite/gallery]`
///
/// Decoding overlaps detection. Under [`OverlapPolicy::Skip`] the detector
/// queue holds a single frame, so a slow detector sees only the latest frame
/// that fit rather than a growing backlog.
pub struct ThreadedScanExecutor {
    policy: OverlapPolicy,
    channel_capacity: usize,
    annotate_dir: Option<PathBuf>,
    label_font: Option<LabelFont>,
}

/// Counts reported back after a threaded scan.
#[derive(Debug)]
pub struct ScanOutcome {
    pub gallery: FaceGallery,
    pub frames_scanned: usize,
    pub frames_skipped: usize,
}

impl ThreadedScanExecutor {
    pub fn new(policy: OverlapPolicy) -> Self {
        let channel_capacity = match policy {
            OverlapPolicy::Queue => QUEUE_CHANNEL_CAPACITY,
            OverlapPolicy::Skip => 1,
        };
        Self {
            policy,
            channel_capacity,
            annotate_dir: None,
            label_font: None,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_annotation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.annotate_dir = Some(dir.into());
        self
    }

    pub fn with_label_font(mut self, font: LabelFont) -> Self {
        self.label_font = Some(font);
        self
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        image_writer: &dyn ImageWriter,
        logger: &mut dyn PipelineLogger,
        metadata: &VideoMetadata,
        output_dir: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ScanOutcome, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;
        let cancelled = Arc::new(AtomicBool::new(false));
        let skipped = Arc::new(AtomicUsize::new(0));

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (detected_tx, detected_rx) =
            crossbeam_channel::bounded::<Result<(Frame, Vec<DetectedFace>, f64), SendError>>(cap);

        logger.info(&format!(
            "Scanning {} frames ({:?} policy)",
            metadata.total_frames, self.policy
        ));

        let queue_monitor = frame_rx.clone();
        let reader_handle = spawn_reader(
            reader,
            frame_tx,
            self.policy,
            cancelled.clone(),
            skipped.clone(),
        );
        let detect_handle = spawn_detector(detector, frame_rx, detected_tx, cancelled.clone());

        let main = MainLoop {
            image_writer,
            output_dir,
            annotation: self
                .annotate_dir
                .as_deref()
                .map(|dir| Annotation::new(dir, self.label_font.as_ref())),
            total_frames: metadata.total_frames,
            on_progress: &on_progress,
        };
        let result = main.run(detected_rx, queue_monitor, logger);

        if result.is_err() {
            cancelled.store(true, Ordering::Relaxed);
        }

        let joined = join_threads(reader_handle, detect_handle);
        let (gallery, frames_scanned) = result?;
        joined?;

        let frames_skipped = skipped.load(Ordering::Relaxed);
        if frames_skipped > 0 {
            logger.info(&format!("Skipped {frames_skipped} frames while detection was busy"));
        }
        logger.summary();

        Ok(ScanOutcome {
            gallery,
            frames_scanned,
            frames_skipped,
        })
    }
}

impl Default for ThreadedScanExecutor {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<Result<Frame, SendError>>,
    policy: OverlapPolicy,
    cancelled: Arc<AtomicBool>,
    skipped: Arc<AtomicUsize>,
) -> std::thread::JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });

            let delivered = match (policy, mapped) {
                (OverlapPolicy::Skip, Ok(frame)) => match frame_tx.try_send(Ok(frame)) {
                    Ok(()) => true,
                    Err(TrySendError::Full(dropped)) => {
                        if let Ok(frame) = dropped {
                            log::trace!("detector busy, dropping frame {}", frame.index());
                        }
                        skipped.fetch_add(1, Ordering::Relaxed);
                        true
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                },
                // errors and queued frames always go through
                (_, mapped) => frame_tx.send(mapped).is_ok(),
            };
            if !delivered {
                break;
            }
        }
        reader.close();
        reader
    })
}

fn spawn_detector(
    mut detector: Box<dyn FaceDetector>,
    frame_rx: Receiver<Result<Frame, SendError>>,
    detected_tx: Sender<Result<(Frame, Vec<DetectedFace>, f64), SendError>>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<Box<dyn FaceDetector>> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            let result = frame_result.and_then(|frame| {
                let t0 = Instant::now();
                match detector.detect(&frame) {
                    Ok(faces) => Ok((frame, faces, elapsed_ms(t0))),
                    Err(e) => Err(e.to_string().into()),
                }
            });

            if detected_tx.send(result).is_err() {
                break;
            }
        }
        detector
    })
}

/// Main-thread half of the pipeline: composites detections and fills the
/// gallery in arrival order.
struct MainLoop<'a> {
    image_writer: &'a dyn ImageWriter,
    output_dir: &'a Path,
    annotation: Option<Annotation<'a>>,
    total_frames: usize,
    on_progress: &'a Option<ProgressCallback>,
}

impl MainLoop<'_> {
    /// Returns the gallery and the number of frames that reached the detector.
    fn run(
        &self,
        detected_rx: Receiver<Result<(Frame, Vec<DetectedFace>, f64), SendError>>,
        queue_monitor: Receiver<Result<Frame, SendError>>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(FaceGallery, usize), Box<dyn std::error::Error>> {
        let mut gallery = FaceGallery::new();
        let mut scanned = 0usize;

        for detected in detected_rx {
            let (frame, faces, detect_ms) = detected.map_err(|e| e.to_string())?;
            scanned += 1;
            logger.timing("detect", detect_ms);
            logger.metric("detect_queue_depth", queue_monitor.len() as f64);
            logger.faces(frame.index(), faces.len());

            if !faces.is_empty() {
                let t0 = Instant::now();
                let stored = store_faces(
                    &frame,
                    faces,
                    self.image_writer,
                    self.output_dir,
                    self.annotation,
                )?;
                logger.timing("composite", elapsed_ms(t0));
                gallery.extend(stored);
            }

            logger.progress(frame.index() + 1, self.total_frames);
            report_progress(self.on_progress, frame.index() + 1, self.total_frames)?;
        }

        Ok((gallery, scanned))
    }
}

/// Joins the worker threads and reports the first panic.
fn join_threads(
    reader_handle: std::thread::JoinHandle<Box<dyn VideoReader>>,
    detect_handle: std::thread::JoinHandle<Box<dyn FaceDetector>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = reader_handle.join();
    let detector = detect_handle.join();

    if reader.is_err() {
        return Err("Reader thread panicked".into());
    }
    if detector.is_err() {
        return Err("Detect thread panicked".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::shared::bounding_box::BoundingBox;
    use std::sync::Mutex;
    use std::time::Duration;

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Result<Frame, String>>,
    }

    impl StubReader {
        fn new(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Ok(make_frame(i))).collect(),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(metadata(self.frames.len()))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(
                self.frames
                    .drain(..)
                    .map(|r| r.map_err(|e| -> Box<dyn std::error::Error> { e.into() })),
            )
        }

        fn close(&mut self) {}
    }

    /// Reports one face per frame, optionally sleeping to simulate a slow scan.
    struct StubDetector {
        delay: Duration,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            std::thread::sleep(self.delay);
            Ok(vec![DetectedFace {
                id: format!("face_{}", frame.index()),
                timestamp: "2024-01-01T00:00:00.000Z".into(),
                image_data: None,
                bounding_box: BoundingBox::new(0, 0, 4, 4),
                confidence: 0.8,
            }])
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            Err("detector exploded".into())
        }
    }

    struct StubImageWriter {
        written: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl StubImageWriter {
        fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ImageWriter for StubImageWriter {
        fn write(
            &self,
            path: &Path,
            _frame: &Frame,
            _size: Option<(u32, u32)>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    // --- Helpers ---

    fn make_frame(index: usize) -> Frame {
        Frame::new(vec![0; 8 * 8 * 4], 8, 8, index).unwrap()
    }

    fn metadata(total: usize) -> VideoMetadata {
        VideoMetadata {
            width: 8,
            height: 8,
            fps: 30.0,
            total_frames: total,
            source_path: None,
        }
    }

    fn detector(delay_ms: u64) -> Box<dyn FaceDetector> {
        Box::new(StubDetector {
            delay: Duration::from_millis(delay_ms),
        })
    }

    // --- Tests ---

    #[test]
    fn test_queue_policy_scans_every_frame_in_order() {
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let outcome = ThreadedScanExecutor::new(OverlapPolicy::Queue)
            .execute(
                Box::new(StubReader::new(20)),
                detector(0),
                &writer,
                &mut logger,
                &metadata(20),
                Path::new("/out"),
                None,
            )
            .unwrap();

        assert_eq!(outcome.frames_scanned, 20);
        assert_eq!(outcome.frames_skipped, 0);
        let ids: Vec<String> = outcome.gallery.faces().iter().map(|f| f.id.clone()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("face_{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(writer.written.lock().unwrap().len(), 20);
    }

    #[test]
    fn test_skip_policy_drops_frames_while_detector_busy() {
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let outcome = ThreadedScanExecutor::new(OverlapPolicy::Skip)
            .execute(
                Box::new(StubReader::new(10)),
                detector(50),
                &writer,
                &mut logger,
                &metadata(10),
                Path::new("/out"),
                None,
            )
            .unwrap();

        assert!(outcome.frames_scanned >= 1);
        assert!(outcome.frames_skipped > 0);
        assert_eq!(outcome.frames_scanned + outcome.frames_skipped, 10);
        assert_eq!(outcome.gallery.len(), outcome.frames_scanned);
        // the first frame always finds an empty queue
        assert_eq!(outcome.gallery.faces()[0].id, "face_0");
    }

    #[test]
    fn test_skip_policy_keeps_frame_order() {
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let outcome = ThreadedScanExecutor::new(OverlapPolicy::Skip)
            .execute(
                Box::new(StubReader::new(10)),
                detector(20),
                &writer,
                &mut logger,
                &metadata(10),
                Path::new("/out"),
                None,
            )
            .unwrap();

        let indices: Vec<usize> = outcome
            .gallery
            .faces()
            .iter()
            .map(|f| f.id.trim_start_matches("face_").parse().unwrap())
            .collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_detector_error_propagates() {
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let err = ThreadedScanExecutor::default()
            .execute(
                Box::new(StubReader::new(5)),
                Box::new(FailingDetector),
                &writer,
                &mut logger,
                &metadata(5),
                Path::new("/out"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "detector exploded");
    }

    #[test]
    fn test_reader_error_propagates() {
        let reader = StubReader {
            frames: vec![Ok(make_frame(0)), Err("corrupt frame".into())],
        };
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let err = ThreadedScanExecutor::default()
            .execute(
                Box::new(reader),
                detector(0),
                &writer,
                &mut logger,
                &metadata(2),
                Path::new("/out"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "corrupt frame");
    }

    #[test]
    fn test_cancel_via_progress() {
        let writer = StubImageWriter::new();
        let mut logger = NullPipelineLogger;
        let err = ThreadedScanExecutor::default()
            .execute(
                Box::new(StubReader::new(50)),
                detector(0),
                &writer,
                &mut logger,
                &metadata(50),
                Path::new("/out"),
                Some(Box::new(|current, _total| current < 3)),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Cancelled");
    }

    #[test]
    fn test_logger_records_stages() {
        let writer = StubImageWriter::new();
        let mut logger = StdoutPipelineLogger::new(1);
        ThreadedScanExecutor::default()
            .execute(
                Box::new(StubReader::new(3)),
                detector(0),
                &writer,
                &mut logger,
                &metadata(3),
                Path::new("/out"),
                None,
            )
            .unwrap();

        assert_eq!(logger.timings_for("detect").unwrap().len(), 3);
        assert_eq!(logger.timings_for("composite").unwrap().len(), 3);
        assert_eq!(logger.metrics_for("detect_queue_depth").unwrap().len(), 3);
        assert_eq!(logger.faces_total(), 3);
    }

    #[test]
    fn test_capacity_defaults_follow_policy() {
        assert_eq!(ThreadedScanExecutor::new(OverlapPolicy::Queue).channel_capacity, 8);
        assert_eq!(ThreadedScanExecutor::new(OverlapPolicy::Skip).channel_capacity, 1);
        assert_eq!(
            ThreadedScanExecutor::new(OverlapPolicy::Skip)
                .with_channel_capacity(0)
                .channel_capacity,
            1
        );
        assert_eq!(ThreadedScanExecutor::default().policy(), OverlapPolicy::Queue);
    }
}
