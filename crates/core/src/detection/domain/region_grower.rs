use crate::detection::domain::skin_classifier::is_skin_color;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{EDGE_SAMPLE_STRIDE, MAX_GROWTH_ROUNDS};
use crate::shared::frame::Frame;

/// Grows a box outward from a seed pixel while its borders keep touching
/// skin, then squares it.
///
/// Each round tries the left, right, top and bottom edges in that order,
/// pushing an edge out by one pixel when any pixel on the line just beyond
/// it (sampled every third pixel) is skin. Growth ends after a round that
/// moves no edge, after [`MAX_GROWTH_ROUNDS`] rounds, or as soon as either
/// side exceeds `max_size` at the end of a round; the box reached so far is
/// kept in every case.
///
/// Returns `None` for a zero-area frame or a seed outside it.
pub fn find_face_bounds(
    frame: &Frame,
    seed_x: u32,
    seed_y: u32,
    max_size: u32,
) -> Option<BoundingBox> {
    let (width, height) = (frame.width(), frame.height());
    if frame.is_empty() || seed_x >= width || seed_y >= height {
        return None;
    }

    let (mut min_x, mut max_x) = (seed_x, seed_x);
    let (mut min_y, mut max_y) = (seed_y, seed_y);

    let mut rounds = 0;
    let mut expanded = true;

    while expanded && rounds < MAX_GROWTH_ROUNDS {
        expanded = false;
        rounds += 1;

        if min_x > 0 && column_has_skin(frame, min_x - 1, min_y, max_y) {
            min_x -= 1;
            expanded = true;
        }
        if max_x < width - 1 && column_has_skin(frame, max_x + 1, min_y, max_y) {
            max_x += 1;
            expanded = true;
        }
        if min_y > 0 && row_has_skin(frame, min_y - 1, min_x, max_x) {
            min_y -= 1;
            expanded = true;
        }
        if max_y < height - 1 && row_has_skin(frame, max_y + 1, min_x, max_x) {
            max_y += 1;
            expanded = true;
        }

        if max_x - min_x > max_size || max_y - min_y > max_size {
            break;
        }
    }

    let grown = BoundingBox::from_extents(min_x as i32, min_y as i32, max_x as i32, max_y as i32);
    Some(grown.squared(width, height))
}

fn column_has_skin(frame: &Frame, x: u32, y_from: u32, y_to: u32) -> bool {
    (y_from..=y_to).step_by(EDGE_SAMPLE_STRIDE).any(|y| {
        let (r, g, b) = frame.pixel(x, y);
        is_skin_color(r, g, b)
    })
}

fn row_has_skin(frame: &Frame, y: u32, x_from: u32, x_to: u32) -> bool {
    (x_from..=x_to).step_by(EDGE_SAMPLE_STRIDE).any(|x| {
        let (r, g, b) = frame.pixel(x, y);
        is_skin_color(r, g, b)
    })
}
