use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Adapts image files to the [`VideoReader`] interface.
///
/// A single image is a one-frame video with `fps=0` (frames carry no
/// timestamp). A directory is read as a frame sequence: every file with a
/// supported image extension, sorted by file name, played back at the
/// configured fps. Frames are decoded lazily into RGBA.
pub struct ImageFileReader {
    fps: f64,
    paths: Vec<PathBuf>,
    metadata: Option<VideoMetadata>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::with_fps(0.0)
    }

    /// Playback rate applied when the source is a directory of frames.
    pub fn with_fps(fps: f64) -> Self {
        Self {
            fps,
            paths: Vec::new(),
            metadata: None,
        }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn decode_frame(
    path: &Path,
    index: usize,
    metadata: &VideoMetadata,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgba8();
    let (width, height) = img.dimensions();
    if width != metadata.width || height != metadata.height {
        return Err(format!(
            "{}: frame is {width}x{height}, sequence is {}x{}",
            path.display(),
            metadata.width,
            metadata.height
        )
        .into());
    }

    let frame = Frame::new(img.into_raw(), width, height, index)?;
    Ok(match metadata.timestamp_ms(index) {
        Some(ts) => frame.with_timestamp_ms(ts),
        None => frame,
    })
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let (paths, fps) = if path.is_dir() {
            let paths = list_frames(path)?;
            if paths.is_empty() {
                return Err(format!("No image frames found in {}", path.display()).into());
            }
            (paths, self.fps)
        } else {
            (vec![path.to_path_buf()], 0.0)
        };

        let (width, height) = image::image_dimensions(&paths[0])?;
        log::debug!(
            "opened {} ({} frames, {width}x{height})",
            path.display(),
            paths.len()
        );

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(metadata) = &self.metadata else {
            return Box::new(std::iter::once(Err("ImageFileReader: not opened".into())));
        };
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(move |(index, path)| decode_frame(path, index, metadata)),
        )
    }

    fn close(&mut self) {
        self.paths.clear();
        self.metadata = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb(rgb);
        }
        img.save(path).unwrap();
    }

    fn write_sequence(dir: &Path, count: usize) {
        // written out of order to check sorting
        for i in (0..count).rev() {
            let shade = (i * 10) as u8;
            write_test_image(&dir.join(format!("frame_{i:03}.png")), 20, 10, [shade, 0, 0]);
        }
    }

    #[test]
    fn test_open_single_image_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        write_test_image(&path, 100, 80, [50, 100, 200]);

        let mut reader = ImageFileReader::with_fps(30.0);
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.width, 100);
        assert_eq!(meta.height, 80);
        assert_eq!(meta.fps, 0.0);
        assert_eq!(meta.total_frames, 1);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_raises() {
        let mut reader = ImageFileReader::new();
        assert!(reader.open(Path::new("/nonexistent/test.png")).is_err());
    }

    #[test]
    fn test_single_image_frame_is_rgba_without_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        write_test_image(&path, 100, 80, [50, 100, 200]);
        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<_> = reader.frames().collect();
        assert_eq!(frames.len(), 1);
        let frame = frames.into_iter().next().unwrap().unwrap();
        assert_eq!(frame.index(), 0);
        assert_eq!(frame.timestamp_ms(), None);
        assert_eq!(&frame.data()[..4], &[50, 100, 200, 255]);
        assert_eq!((frame.width(), frame.height()), (100, 80));
    }

    #[test]
    fn test_directory_reads_sorted_sequence_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path(), 4);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut reader = ImageFileReader::with_fps(20.0);
        let meta = reader.open(dir.path()).unwrap();
        assert_eq!(meta.total_frames, 4);
        assert_eq!(meta.fps, 20.0);

        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        let shades: Vec<u8> = frames.iter().map(|f| f.data()[0]).collect();
        let stamps: Vec<Option<u64>> = frames.iter().map(|f| f.timestamp_ms()).collect();
        assert_eq!(shades, vec![0, 10, 20, 30]);
        assert_eq!(stamps, vec![Some(0), Some(50), Some(100), Some(150)]);
    }

    #[test]
    fn test_empty_directory_raises() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ImageFileReader::with_fps(30.0);
        assert!(reader.open(dir.path()).is_err());
    }

    #[test]
    fn test_mismatched_frame_size_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_test_image(&dir.path().join("a.png"), 20, 10, [0, 0, 0]);
        write_test_image(&dir.path().join("b.png"), 10, 10, [0, 0, 0]);

        let mut reader = ImageFileReader::with_fps(10.0);
        reader.open(dir.path()).unwrap();
        let results: Vec<_> = reader.frames().collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = ImageFileReader::new();
        let result = reader.frames().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        write_test_image(&path, 10, 10, [0, 0, 0]);
        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_is_image_file_ignores_case() {
        assert!(is_image_file(Path::new("a/B.PNG")));
        assert!(is_image_file(Path::new("x.jpeg")));
        assert!(!is_image_file(Path::new("x.mp4")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
