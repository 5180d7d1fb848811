use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use ndarray::s;

use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::LABEL_FONT_CANDIDATES;
use crate::shared::frame::{Frame, FrameError, CHANNELS};
use crate::video::domain::image_writer::ImageWriter;

/// Outline and label colour for annotated frames (opaque green).
pub const OUTLINE_COLOR: [u8; 4] = [0, 255, 0, 255];
pub const OUTLINE_THICKNESS: u32 = 3;
/// Label glyph height in pixels.
pub const LABEL_SCALE: f32 = 16.0;
/// Gap between the label baseline and the top of its box.
pub const LABEL_OFFSET: i32 = 10;

/// Font used for `Face <n>` labels on annotated frames.
pub type LabelFont = FontVec;

/// Clamps `bbox` to the frame as half-open pixel ranges `(x1, y1, x2, y2)`.
fn clamp_to_frame(frame: &Frame, bbox: &BoundingBox) -> (usize, usize, usize, usize) {
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let x1 = (bbox.x as i64).clamp(0, fw);
    let y1 = (bbox.y as i64).clamp(0, fh);
    let x2 = (bbox.x as i64 + bbox.width.max(0) as i64).clamp(x1, fw);
    let y2 = (bbox.y as i64 + bbox.height.max(0) as i64).clamp(y1, fh);
    (x1 as usize, y1 as usize, x2 as usize, y2 as usize)
}

/// Copies the pixels under `bbox` into a new frame.
///
/// The box is clamped to the frame first; a box entirely outside yields a
/// zero-area frame. The crop keeps the source frame's index.
pub fn crop_face(frame: &Frame, bbox: &BoundingBox) -> Result<Frame, FrameError> {
    let (x1, y1, x2, y2) = clamp_to_frame(frame, bbox);
    let view = frame.as_ndarray();
    let data: Vec<u8> = view.slice(s![y1..y2, x1..x2, ..]).iter().copied().collect();
    Frame::new(data, (x2 - x1) as u32, (y2 - y1) as u32, frame.index())
}

/// Returns a copy of `frame` with each face box outlined and, when a font is
/// given, labelled `Face 1`, `Face 2`, ... in detection order.
///
/// The outline is drawn inward from the box edge. Labels sit above their
/// box; any part falling outside the frame is clipped.
pub fn annotate_faces(
    frame: &Frame,
    faces: &[DetectedFace],
    label_font: Option<&LabelFont>,
) -> Result<Frame, FrameError> {
    let (width, height) = (frame.width(), frame.height());
    let mut img = RgbaImage::from_raw(width, height, frame.data().to_vec()).ok_or(
        FrameError::BufferSize {
            width,
            height,
            expected: width as usize * height as usize * CHANNELS,
            actual: frame.data().len(),
        },
    )?;
    let color = Rgba(OUTLINE_COLOR);

    for (n, face) in faces.iter().enumerate() {
        let (x1, y1, x2, y2) = clamp_to_frame(frame, &face.bounding_box);
        for inset in 0..OUTLINE_THICKNESS as usize {
            let w = (x2 - x1).saturating_sub(2 * inset);
            let h = (y2 - y1).saturating_sub(2 * inset);
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at((x1 + inset) as i32, (y1 + inset) as i32).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut img, rect, color);
        }

        if let Some(font) = label_font {
            let top = y1 as i32 - LABEL_OFFSET - LABEL_SCALE as i32;
            let label = format!("Face {}", n + 1);
            draw_text_mut(&mut img, color, x1 as i32, top, LABEL_SCALE, font, &label);
        }
    }

    let annotated = Frame::new(img.into_raw(), width, height, frame.index())?;
    Ok(match frame.timestamp_ms() {
        Some(ts) => annotated.with_timestamp_ms(ts),
        None => annotated,
    })
}

/// Reads a TrueType/OpenType font for annotation labels.
pub fn load_label_font(path: &Path) -> Result<LabelFont, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| format!("{}: not a usable font ({e})", path.display()).into())
}

/// First installed font from [`LABEL_FONT_CANDIDATES`], if any.
pub fn find_label_font() -> Option<PathBuf> {
    LABEL_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// Crops `face` out of `frame`, writes it to `<output_dir>/<id>.png` and
/// returns the face with `image_data` pointing at the written file.
pub fn composite_face(
    frame: &Frame,
    face: DetectedFace,
    writer: &dyn ImageWriter,
    output_dir: &Path,
) -> Result<DetectedFace, Box<dyn std::error::Error>> {
    let crop = crop_face(frame, &face.bounding_box)?;
    if crop.is_empty() {
        return Err(format!("{}: bounding box lies outside the frame", face.id).into());
    }
    let path = output_dir.join(format!("{}.png", face.id));
    writer.write(&path, &crop, None)?;
    Ok(face.with_image_data(path.to_string_lossy()))
}
