/// Smallest accepted box side; also the side of the seed sampling window.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 40;
/// Region growth stops once either side exceeds this.
pub const DEFAULT_MAX_FACE_SIZE: u32 = 250;
pub const DEFAULT_SCAN_STEP_SIZE: u32 = 15;
/// Minimum skin-pixel ratio for a seed window.
pub const DEFAULT_SKIN_THRESHOLD: f64 = 0.25;
pub const DEFAULT_EXPAND_FACTOR: f64 = 1.5;
/// Pixel stride used when sampling a seed window.
pub const DEFAULT_SAMPLE_STRIDE: u32 = 3;

/// Coarse preset: larger windows, sparser grid, wider sampling.
pub const COARSE_MIN_FACE_SIZE: u32 = 60;
pub const COARSE_MAX_FACE_SIZE: u32 = 300;
pub const COARSE_SCAN_STEP_SIZE: u32 = 30;
pub const COARSE_SKIN_THRESHOLD: f64 = 0.3;
pub const COARSE_SAMPLE_STRIDE: u32 = 5;

/// Pixel stride along a candidate edge during region growth.
pub const EDGE_SAMPLE_STRIDE: usize = 3;
/// Upper bound on growth rounds per seed.
pub const MAX_GROWTH_ROUNDS: usize = 20;

/// Simulated confidence lies in `[CONFIDENCE_FLOOR, CONFIDENCE_FLOOR + CONFIDENCE_SPAN]`.
pub const CONFIDENCE_FLOOR: f64 = 0.7;
pub const CONFIDENCE_SPAN: f64 = 0.3;

/// Detection runs at most this often while frames are flowing (~10 fps).
pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 100;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CONFIG_DIR_NAME: &str = "skinscan";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Fonts tried in order for annotation labels when none is given.
pub const LABEL_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];
