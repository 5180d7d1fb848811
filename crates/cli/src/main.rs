use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use skinscan_core::detection::domain::detection_config::DetectionConfig;
use skinscan_core::detection::domain::face_detector::FaceDetector;
use skinscan_core::detection::infrastructure::interval_detector::IntervalDetector;
use skinscan_core::detection::infrastructure::skin_scan_detector::SkinScanDetector;
use skinscan_core::pipeline::face_compositor::{find_label_font, load_label_font, LabelFont};
use skinscan_core::pipeline::face_gallery::FaceGallery;
use skinscan_core::pipeline::infrastructure::threaded_scan_executor::{
    OverlapPolicy, ThreadedScanExecutor,
};
use skinscan_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use skinscan_core::pipeline::scan_faces_use_case::{ProgressCallback, ScanFacesUseCase};
use skinscan_core::shared::config_resolver;
use skinscan_core::shared::constants::DEFAULT_DETECTION_INTERVAL_MS;
use skinscan_core::shared::video_metadata::VideoMetadata;
use skinscan_core::video::domain::video_reader::VideoReader;
use skinscan_core::video::infrastructure::image_file_reader::ImageFileReader;
use skinscan_core::video::infrastructure::image_file_writer::ImageFileWriter;

const DEFAULT_SEQUENCE_FPS: f64 = 30.0;
const MANIFEST_FILE_NAME: &str = "gallery.json";

/// Scan images or frame sequences for skin-tone face regions and save crops.
#[derive(Parser, Debug)]
#[command(name = "skinscan")]
struct Cli {
    /// Input image file, or a directory of frames played back in name order.
    input: PathBuf,

    /// Directory for face crops.
    #[arg(long, default_value = "faces")]
    output: PathBuf,

    /// Detection config file (JSON). Defaults to the user config, then built-ins.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Smallest face side in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Stop growing a region once a side exceeds this many pixels.
    #[arg(long)]
    max_face_size: Option<u32>,

    /// Seed grid spacing in pixels.
    #[arg(long = "scan-step")]
    scan_step: Option<u32>,

    /// Minimum skin-pixel ratio for a seed window (0.0-1.0).
    #[arg(long)]
    skin_threshold: Option<f64>,

    /// Scale applied to each accepted box (>= 1.0).
    #[arg(long)]
    expand_factor: Option<f64>,

    /// Pixel stride when sampling a seed window.
    #[arg(long)]
    sample_stride: Option<u32>,

    /// Playback rate for frame directories.
    #[arg(long, default_value_t = DEFAULT_SEQUENCE_FPS)]
    fps: f64,

    /// Minimum time between detections in milliseconds (0 = every frame).
    #[arg(long, default_value_t = DEFAULT_DETECTION_INTERVAL_MS)]
    interval_ms: u64,

    /// What to do with frames that arrive while detection is busy (with --threaded).
    #[arg(long, value_enum, default_value = "queue")]
    policy: PolicyArg,

    /// Gallery manifest path. Defaults to <output>/gallery.json.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Write frames with outlined faces to this directory.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Font for the "Face N" labels on annotated frames. Defaults to a system font.
    #[arg(long, requires = "annotate")]
    label_font: Option<PathBuf>,

    /// Copy every crop to this directory with timestamped names after the scan.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export only the face with this id (repeatable).
    #[arg(long = "export-face", requires = "export")]
    export_faces: Vec<String>,

    /// Decode and detect on separate threads.
    #[arg(long)]
    threaded: bool,

    /// Print the merged detection config and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Queue,
    Skip,
}

impl From<PolicyArg> for OverlapPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Queue => OverlapPolicy::Queue,
            PolicyArg::Skip => OverlapPolicy::Skip,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let mut reader: Box<dyn VideoReader> = Box::new(ImageFileReader::with_fps(cli.fps));
    let metadata = reader.open(&cli.input)?;
    log::info!(
        "Opened {} ({}x{}, {} frames)",
        cli.input.display(),
        metadata.width,
        metadata.height,
        metadata.total_frames
    );

    let label_font = resolve_label_font(&cli)?;
    let detector = build_detector(config, cli.interval_ms);
    let gallery = if cli.threaded {
        run_threaded(&cli, reader, detector, label_font, &metadata)?
    } else {
        run_sequential(&cli, reader, detector, label_font, &metadata)?
    };
    eprintln!();

    let manifest = cli
        .manifest
        .clone()
        .unwrap_or_else(|| cli.output.join(MANIFEST_FILE_NAME));
    gallery.save_manifest(&manifest)?;
    log::info!(
        "Saved {} face crops to {} (manifest {})",
        gallery.len(),
        cli.output.display(),
        manifest.display()
    );

    if let Some(ref export_dir) = cli.export {
        if cli.export_faces.is_empty() {
            gallery.export_all(export_dir)?;
        } else {
            gallery.export_selected(&cli.export_faces, export_dir)?;
        }
    }

    Ok(())
}

fn run_sequential(
    cli: &Cli,
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    label_font: Option<LabelFont>,
    metadata: &VideoMetadata,
) -> Result<FaceGallery, Box<dyn std::error::Error>> {
    let mut use_case = ScanFacesUseCase::new(
        reader,
        detector,
        Box::new(ImageFileWriter::new()),
        Box::new(StdoutPipelineLogger::default()),
        Some(progress_printer()),
    );
    if let Some(ref dir) = cli.annotate {
        use_case = use_case.with_annotation_dir(dir);
    }
    if let Some(font) = label_font {
        use_case = use_case.with_label_font(font);
    }
    use_case.execute(metadata, &cli.output)
}

fn run_threaded(
    cli: &Cli,
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    label_font: Option<LabelFont>,
    metadata: &VideoMetadata,
) -> Result<FaceGallery, Box<dyn std::error::Error>> {
    let mut executor = ThreadedScanExecutor::new(cli.policy.into());
    if let Some(ref dir) = cli.annotate {
        executor = executor.with_annotation_dir(dir);
    }
    if let Some(font) = label_font {
        executor = executor.with_label_font(font);
    }

    let writer = ImageFileWriter::new();
    let mut logger = StdoutPipelineLogger::default();
    let outcome = executor.execute(
        reader,
        detector,
        &writer,
        &mut logger,
        metadata,
        &cli.output,
        Some(progress_printer()),
    )?;
    log::info!(
        "Scanned {} frames, skipped {}",
        outcome.frames_scanned,
        outcome.frames_skipped
    );
    Ok(outcome.gallery)
}

fn progress_printer() -> ProgressCallback {
    Box::new(|current, total| {
        eprint!("\rScanning frame {current}/{total}");
        true
    })
}

/// Loads the label font for annotated frames: `--label-font` when given,
/// otherwise the first installed system font. `None` without `--annotate`.
fn resolve_label_font(cli: &Cli) -> Result<Option<LabelFont>, Box<dyn std::error::Error>> {
    if cli.annotate.is_none() {
        return Ok(None);
    }
    if let Some(ref path) = cli.label_font {
        return load_label_font(path).map(Some);
    }
    match find_label_font() {
        Some(path) => {
            log::debug!("labelling annotated frames with {}", path.display());
            load_label_font(&path).map(Some)
        }
        None => {
            log::warn!("no label font found; annotated frames get outlines only");
            Ok(None)
        }
    }
}

fn build_detector(config: DetectionConfig, interval_ms: u64) -> Box<dyn FaceDetector> {
    let base: Box<dyn FaceDetector> = Box::new(SkinScanDetector::new(config));
    if interval_ms > 0 {
        Box::new(IntervalDetector::new(base, interval_ms))
    } else {
        base
    }
}

/// Resolves the config file, then overrides it field by field with any
/// flags given, and validates the result.
fn build_config(cli: &Cli) -> Result<DetectionConfig, Box<dyn std::error::Error>> {
    let mut config = config_resolver::resolve(cli.config.as_deref())?;
    apply_overrides(cli, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut DetectionConfig) {
    if let Some(v) = cli.min_face_size {
        config.min_face_size = v;
    }
    if let Some(v) = cli.max_face_size {
        config.max_face_size = v;
    }
    if let Some(v) = cli.scan_step {
        config.scan_step_size = v;
    }
    if let Some(v) = cli.skin_threshold {
        config.skin_threshold = v;
    }
    if let Some(v) = cli.expand_factor {
        config.expand_factor = v;
    }
    if let Some(v) = cli.sample_stride {
        config.sample_stride = v;
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if cli.input.is_dir() && !(cli.fps > 0.0 && cli.fps.is_finite()) {
        return Err(format!("FPS must be a positive number, got {}", cli.fps).into());
    }
    if cli.policy == PolicyArg::Skip && !cli.threaded {
        log::warn!("--policy skip only applies with --threaded");
    }
    if is_same_dir(&cli.output, cli.export.as_deref()) {
        return Err("--export must differ from --output".into());
    }
    Ok(())
}

fn is_same_dir(a: &Path, b: Option<&Path>) -> bool {
    b.is_some_and(|b| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["skinscan", "frames"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.output, PathBuf::from("faces"));
        assert_eq!(cli.fps, DEFAULT_SEQUENCE_FPS);
        assert_eq!(cli.interval_ms, DEFAULT_DETECTION_INTERVAL_MS);
        assert_eq!(cli.policy, PolicyArg::Queue);
        assert!(!cli.threaded);
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let cli = parse(&["--min-face-size", "60", "--skin-threshold", "0.4", "--scan-step", "5"]);
        let mut config = DetectionConfig::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.min_face_size, 60);
        assert_eq!(config.skin_threshold, 0.4);
        assert_eq!(config.scan_step_size, 5);
        let defaults = DetectionConfig::default();
        assert_eq!(config.max_face_size, defaults.max_face_size);
        assert_eq!(config.expand_factor, defaults.expand_factor);
        assert_eq!(config.sample_stride, defaults.sample_stride);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = parse(&["--skin-threshold", "1.5"]);
        let mut config = DetectionConfig::default();
        apply_overrides(&cli, &mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_parses() {
        let cli = parse(&["--policy", "skip", "--threaded"]);
        assert_eq!(OverlapPolicy::from(cli.policy), OverlapPolicy::Skip);
        assert!(Cli::try_parse_from(["skinscan", "x", "--policy", "drop"]).is_err());
    }

    #[test]
    fn test_label_font_requires_annotate() {
        assert!(Cli::try_parse_from(["skinscan", "x", "--label-font", "f.ttf"]).is_err());
        let cli = parse(&["--annotate", "marked", "--label-font", "f.ttf"]);
        assert_eq!(cli.label_font, Some(PathBuf::from("f.ttf")));
    }

    #[test]
    fn test_no_label_font_without_annotate() {
        let cli = parse(&[]);
        assert!(resolve_label_font(&cli).unwrap().is_none());
    }

    #[test]
    fn test_missing_label_font_is_error() {
        let cli = parse(&["--annotate", "marked", "--label-font", "/nonexistent/font.ttf"]);
        assert!(resolve_label_font(&cli).is_err());
    }

    #[test]
    fn test_export_face_is_repeatable_and_requires_export() {
        assert!(Cli::try_parse_from(["skinscan", "x", "--export-face", "face_1_0.5"]).is_err());
        let cli = parse(&["--export", "out", "--export-face", "a", "--export-face", "b"]);
        assert_eq!(cli.export_faces, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let cli = parse(&[]);
        let cli = Cli {
            input: PathBuf::from("/nonexistent/frames"),
            ..cli
        };
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("Input not found"));
    }

    #[test]
    fn test_export_must_differ_from_output() {
        assert!(is_same_dir(Path::new("faces"), Some(Path::new("faces"))));
        assert!(!is_same_dir(Path::new("faces"), Some(Path::new("export"))));
        assert!(!is_same_dir(Path::new("faces"), None));
    }
}
