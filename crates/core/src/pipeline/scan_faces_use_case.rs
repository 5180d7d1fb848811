use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::face_compositor::{annotate_faces, composite_face, LabelFont};
use crate::pipeline::face_gallery::FaceGallery;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

/// Progress callback: `(frames_done, total_frames) -> keep_going`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Scans every frame of a source for faces, writes one crop per detection
/// and collects the results into a [`FaceGallery`].
///
/// Frames are processed one at a time in presentation order. Each face crop
/// is written to `<output_dir>/<id>.png`; with an annotation directory set,
/// every frame with at least one face is also written there with the boxes
/// outlined, and labelled when a label font is set.
pub struct ScanFacesUseCase {
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    image_writer: Box<dyn ImageWriter>,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<ProgressCallback>,
    annotate_dir: Option<PathBuf>,
    label_font: Option<LabelFont>,
}

impl ScanFacesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        image_writer: Box<dyn ImageWriter>,
        logger: Box<dyn PipelineLogger>,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            reader,
            detector,
            image_writer,
            logger,
            on_progress,
            annotate_dir: None,
            label_font: None,
        }
    }

    pub fn with_annotation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.annotate_dir = Some(dir.into());
        self
    }

    pub fn with_label_font(mut self, font: LabelFont) -> Self {
        self.label_font = Some(font);
        self
    }

    /// Runs the scan. Returns `Err("Cancelled")` when the progress callback
    /// asks to stop; crops written before that point stay on disk. The reader
    /// is closed whether or not the scan succeeds.
    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_dir: &Path,
    ) -> Result<FaceGallery, Box<dyn std::error::Error>> {
        let total_frames = metadata.total_frames;
        self.logger.info(&format!("Scanning {total_frames} frames"));

        let result = self.scan_frames(total_frames, output_dir);
        self.reader.close();
        let gallery = result?;

        self.logger.summary();
        Ok(gallery)
    }

    fn scan_frames(
        &mut self,
        total_frames: usize,
        output_dir: &Path,
    ) -> Result<FaceGallery, Box<dyn std::error::Error>> {
        let Self {
            reader,
            detector,
            image_writer,
            logger,
            on_progress,
            annotate_dir,
            label_font,
        } = self;

        let annotation = annotate_dir
            .as_deref()
            .map(|dir| Annotation::new(dir, label_font.as_ref()));
        let mut gallery = FaceGallery::new();
        let mut frames = reader.frames();

        loop {
            let t0 = Instant::now();
            let Some(frame_result) = frames.next() else {
                break;
            };
            let frame = frame_result?;
            logger.timing("decode", elapsed_ms(t0));

            let t1 = Instant::now();
            let faces = detector.detect(&frame)?;
            logger.timing("detect", elapsed_ms(t1));
            logger.faces(frame.index(), faces.len());

            if !faces.is_empty() {
                let t2 = Instant::now();
                let stored = store_faces(&frame, faces, &**image_writer, output_dir, annotation)?;
                logger.timing("composite", elapsed_ms(t2));
                gallery.extend(stored);
            }

            logger.progress(frame.index() + 1, total_frames);
            report_progress(on_progress, frame.index() + 1, total_frames)?;
        }

        Ok(gallery)
    }
}

/// Where annotated frames go and how their boxes are labelled.
#[derive(Clone, Copy)]
pub(crate) struct Annotation<'a> {
    dir: &'a Path,
    label_font: Option<&'a LabelFont>,
}

impl<'a> Annotation<'a> {
    pub(crate) fn new(dir: &'a Path, label_font: Option<&'a LabelFont>) -> Self {
        Self { dir, label_font }
    }
}

/// Composites each face and, with an [`Annotation`], writes the outlined
/// frame as `frame_<index>.png`.
pub(crate) fn store_faces(
    frame: &Frame,
    faces: Vec<DetectedFace>,
    writer: &dyn ImageWriter,
    output_dir: &Path,
    annotation: Option<Annotation<'_>>,
) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
    if let Some(annotation) = annotation {
        let annotated = annotate_faces(frame, &faces, annotation.label_font)?;
        let path = annotation.dir.join(format!("frame_{:06}.png", frame.index()));
        writer.write(&path, &annotated, None)?;
    }

    faces
        .into_iter()
        .map(|face| composite_face(frame, face, writer, output_dir))
        .collect()
}

pub(crate) fn report_progress(
    on_progress: &Option<ProgressCallback>,
    current: usize,
    total: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref callback) = on_progress {
        if !callback(current, total) {
            return Err("Cancelled".into());
        }
    }
    Ok(())
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
