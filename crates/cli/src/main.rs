use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use ndarray::Array3;
use serde::Serialize;

use facemark_core::detection::domain::detections::{Detections, SelectionPolicy};
use facemark_core::detection::infrastructure::face_detector_adapter::FaceDetectorAdapter;
use facemark_core::landmarks::infrastructure::landmark_extractor::{
    ExtractOptions, LandmarkExtractor,
};
use facemark_core::model::model_provisioner::ModelProvisioner;
use facemark_core::shared::bounding_box::{BoundingBox, FaceRegion};

/// Face detection and 68-point landmark extraction.
#[derive(Parser)]
#[command(name = "facemark")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Model directory (default: $FACEMARK_MODEL_DIR or the platform cache).
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the shape predictor model if missing and print its path.
    FetchModel,

    /// Detect faces in an image and print them as JSON.
    Detect {
        /// Input image file.
        image: PathBuf,

        /// Select the largest face even when only one is found.
        #[arg(long)]
        any_face: bool,
    },

    /// Extract facial landmarks from an image and print them as JSON.
    Landmarks {
        /// Input image file.
        image: PathBuf,

        /// Shape predictor model file (downloaded to the model directory if omitted).
        #[arg(long)]
        model: Option<PathBuf>,

        /// Emit (x, y) pairs instead of (row, col).
        #[arg(long)]
        xy: bool,

        /// Emit the five named landmarks (leye, reye, nose, mouthleft, mouthright).
        #[arg(long)]
        named: bool,

        /// Face box as TOP,LEFT,HEIGHT,WIDTH; skips detection.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        bbox: Option<Vec<i64>>,

        /// Select the largest face even when only one is found.
        #[arg(long)]
        any_face: bool,
    },
}

#[derive(Serialize)]
struct ScoredFace {
    #[serde(flatten)]
    bbox: BoundingBox,
    score: f64,
}

#[derive(Serialize)]
struct DetectReport {
    failed: bool,
    faces: Vec<ScoredFace>,
    largest: Option<ScoredFace>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let provisioner = match cli.model_dir {
        Some(dir) => ModelProvisioner::new(dir),
        None => ModelProvisioner::from_env()?,
    }
    .with_progress(Box::new(|downloaded, total| {
        log::debug!("Downloaded {downloaded}/{total} bytes");
    }));

    match cli.command {
        Command::FetchModel => {
            let path = provisioner.ensure_model(None)?;
            println!("{}", path.display());
        }
        Command::Detect { image, any_face } => {
            let planar = load_planar_rgb(&image)?;
            let mut detector = build_detector()?;
            detector.set_policy(policy(any_face));
            let report = detect_report(&mut detector, &planar);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Landmarks {
            image,
            model,
            xy,
            named,
            bbox,
            any_face,
        } => {
            let region = bbox.map(parse_bbox).transpose()?;
            let planar = load_planar_rgb(&image)?;
            let mut extractor = build_extractor(model.as_deref(), &provisioner)?;
            extractor.detector_mut().set_policy(policy(any_face));
            let options = ExtractOptions {
                xy_output: xy,
                named_format: named,
            };
            let output = extractor.extract(planar.view(), region, options)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn policy(any_face: bool) -> SelectionPolicy {
    if any_face {
        SelectionPolicy::AnyFace
    } else {
        SelectionPolicy::RequireMultiple
    }
}

fn parse_bbox(values: Vec<i64>) -> Result<FaceRegion, String> {
    match values.as_slice() {
        &[top, left, height, width] => Ok(BoundingBox::new((top, left), (height, width)).into()),
        _ => Err(format!(
            "--bbox expects TOP,LEFT,HEIGHT,WIDTH, got {} value(s)",
            values.len()
        )),
    }
}

/// Decode an image file into a planar `(3, H, W)` RGB array.
fn load_planar_rgb(path: &Path) -> Result<Array3<u8>, Box<dyn std::error::Error>> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Array3::from_shape_fn(
        (3, height as usize, width as usize),
        |(c, row, col)| rgb.get_pixel(col as u32, row as u32)[c],
    ))
}

fn detect_report(detector: &mut FaceDetectorAdapter, planar: &Array3<u8>) -> DetectReport {
    let detections = detector.detect_all(planar.view());
    let largest = detections
        .largest(detector.policy())
        .map(|(bbox, score)| ScoredFace { bbox, score });
    match detections {
        Detections::Found { boxes, scores } => DetectReport {
            failed: false,
            faces: boxes
                .into_iter()
                .zip(scores)
                .map(|(bbox, score)| ScoredFace { bbox, score })
                .collect(),
            largest,
        },
        Detections::Failed => DetectReport {
            failed: true,
            faces: Vec::new(),
            largest: None,
        },
    }
}

#[cfg(feature = "dlib")]
fn build_detector() -> Result<FaceDetectorAdapter, Box<dyn std::error::Error>> {
    use facemark_core::detection::infrastructure::dlib_face_detector::DlibFaceDetector;

    Ok(FaceDetectorAdapter::new(Box::new(DlibFaceDetector::new())))
}

#[cfg(feature = "dlib")]
fn build_extractor(
    model: Option<&Path>,
    provisioner: &ModelProvisioner,
) -> Result<LandmarkExtractor, Box<dyn std::error::Error>> {
    Ok(LandmarkExtractor::dlib(model, provisioner)?)
}

#[cfg(not(feature = "dlib"))]
const NO_BACKEND: &str = "facemark was built without the `dlib` feature; rebuild with --features dlib";

#[cfg(not(feature = "dlib"))]
fn build_detector() -> Result<FaceDetectorAdapter, Box<dyn std::error::Error>> {
    Err(NO_BACKEND.into())
}

#[cfg(not(feature = "dlib"))]
fn build_extractor(
    model: Option<&Path>,
    provisioner: &ModelProvisioner,
) -> Result<LandmarkExtractor, Box<dyn std::error::Error>> {
    if let Some(path) = model {
        provisioner.ensure_model(Some(path))?;
    }
    Err(NO_BACKEND.into())
}
