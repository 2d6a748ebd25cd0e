use std::path::Path;

use ndarray::{ArrayView, Dimension};
use thiserror::Error;

use crate::detection::domain::face_detector::BackendError;
use crate::detection::infrastructure::face_detector_adapter::FaceDetectorAdapter;
use crate::landmarks::domain::landmark_predictor::LandmarkPredictor;
use crate::landmarks::domain::landmarks::{LandmarkOutput, Landmarks};
use crate::model::model_provisioner::{ModelError, ModelProvisioner};
use crate::shared::bounding_box::{FaceRegion, InvalidInput, Rectangle};
use crate::shared::image_layout::{to_interleaved, LayoutError};

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("invalid face region: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    ShapeMismatch(#[from] LayoutError),
    #[error("landmark prediction failed: {0}")]
    Prediction(#[source] BackendError),
    #[error("expected 68 landmarks, predictor returned {0}")]
    PointCount(usize),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to load shape predictor from {path}: {source}")]
    PredictorLoad {
        path: String,
        #[source]
        source: BackendError,
    },
}

/// Output shape of [`LandmarkExtractor::extract`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Emit `(x, y)` instead of `(row, col)` pairs.
    pub xy_output: bool,
    /// Emit the five named landmarks; `xy_output` is then ignored.
    pub named_format: bool,
}

/// Extracts 68-point landmarks from planar RGB images.
///
/// When no face region is given, the largest detected face is used; finding
/// none is a normal outcome (`Ok(None)`), not an error. A supplied region
/// bypasses detection entirely.
pub struct LandmarkExtractor {
    detector: FaceDetectorAdapter,
    predictor: Box<dyn LandmarkPredictor>,
    defaults: ExtractOptions,
}

impl LandmarkExtractor {
    pub fn new(detector: FaceDetectorAdapter, predictor: Box<dyn LandmarkPredictor>) -> Self {
        Self {
            detector,
            predictor,
            defaults: ExtractOptions::default(),
        }
    }

    /// Resolves the model file (downloading it if needed) and builds the
    /// predictor from it with `load`.
    ///
    /// An explicit `model` path that does not exist fails immediately with
    /// [`ModelError::ModelNotFound`].
    pub fn from_model<F>(
        model: Option<&Path>,
        provisioner: &ModelProvisioner,
        detector: FaceDetectorAdapter,
        load: F,
    ) -> Result<Self, LandmarkError>
    where
        F: FnOnce(&Path) -> Result<Box<dyn LandmarkPredictor>, BackendError>,
    {
        let path = provisioner.ensure_model(model)?;
        let predictor = load(&path).map_err(|source| LandmarkError::PredictorLoad {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(detector, predictor))
    }

    pub fn with_options(mut self, defaults: ExtractOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn options(&self) -> ExtractOptions {
        self.defaults
    }

    pub fn detector_mut(&mut self) -> &mut FaceDetectorAdapter {
        &mut self.detector
    }

    /// [`extract`](Self::extract) with the options chosen at construction.
    pub fn extract_default<D: Dimension>(
        &mut self,
        image: ArrayView<'_, u8, D>,
        region: Option<FaceRegion>,
    ) -> Result<Option<LandmarkOutput>, LandmarkError> {
        let options = self.defaults;
        self.extract(image, region, options)
    }

    pub fn extract<D: Dimension>(
        &mut self,
        image: ArrayView<'_, u8, D>,
        region: Option<FaceRegion>,
        options: ExtractOptions,
    ) -> Result<Option<LandmarkOutput>, LandmarkError> {
        let rect = match self.resolve_region(image.view(), region)? {
            Some(rect) => rect,
            None => return Ok(None),
        };

        let frame = to_interleaved(image, true)?;
        let points = self
            .predictor
            .predict(&frame, &rect)
            .map_err(LandmarkError::Prediction)?;
        let landmarks =
            Landmarks::new(points).map_err(|points| LandmarkError::PointCount(points.len()))?;

        let output = if options.named_format {
            LandmarkOutput::Named(landmarks.named())
        } else if options.xy_output {
            LandmarkOutput::Points(landmarks.xy())
        } else {
            LandmarkOutput::Points(landmarks.row_col())
        };
        Ok(Some(output))
    }

    fn resolve_region<D: Dimension>(
        &mut self,
        image: ArrayView<'_, u8, D>,
        region: Option<FaceRegion>,
    ) -> Result<Option<Rectangle>, InvalidInput> {
        match region {
            Some(region) => region.to_rectangle().map(Some),
            None => match self.detector.detect_largest(image) {
                Some((bb, _score)) => bb.to_rectangle().map(Some),
                None => {
                    log::info!("No face found; skipping landmark extraction");
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(feature = "dlib")]
impl LandmarkExtractor {
    /// Extractor backed by dlib's frontal face detector and shape predictor.
    pub fn dlib(model: Option<&Path>, provisioner: &ModelProvisioner) -> Result<Self, LandmarkError> {
        use crate::detection::infrastructure::dlib_face_detector::DlibFaceDetector;
        use crate::landmarks::infrastructure::dlib_landmark_predictor::DlibLandmarkPredictor;

        let detector = FaceDetectorAdapter::new(Box::new(DlibFaceDetector::new()));
        Self::from_model(model, provisioner, detector, |path| {
            Ok(Box::new(DlibLandmarkPredictor::open(path)?) as Box<dyn LandmarkPredictor>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detections::SelectionPolicy;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::landmarks::domain::landmarks::{LandmarkOutput, Point, NAMED_KEYS};
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::constants::LANDMARK_COUNT;
    use crate::shared::frame::Frame;
    use ndarray::Array3;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct CountingDetector {
        rects: Vec<Rectangle>,
        calls: Arc<AtomicUsize>,
    }

    impl FaceDetector for CountingDetector {
        fn detect(&mut self, _frame: &Frame, _upscale: u32) -> Result<Vec<Rectangle>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rects.clone())
        }
    }

    /// Returns point `i` at `x = left + i`, `y = top + 2 * i` for the given rect.
    struct FakePredictor {
        count: usize,
        fail: bool,
        rects: Arc<Mutex<Vec<Rectangle>>>,
    }

    impl FakePredictor {
        fn new() -> Self {
            Self {
                count: LANDMARK_COUNT,
                fail: false,
                rects: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl LandmarkPredictor for FakePredictor {
        fn predict(&mut self, _frame: &Frame, rect: &Rectangle) -> Result<Vec<Point>, BackendError> {
            self.rects.lock().unwrap().push(*rect);
            if self.fail {
                return Err("predictor exploded".into());
            }
            Ok((0..self.count as i64)
                .map(|i| Point::new(rect.left + i, rect.top + 2 * i))
                .collect())
        }
    }

    fn extractor(rects: Vec<Rectangle>, predictor: FakePredictor) -> (LandmarkExtractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = CountingDetector {
            rects,
            calls: calls.clone(),
        };
        let adapter = FaceDetectorAdapter::new(Box::new(detector));
        (LandmarkExtractor::new(adapter, Box::new(predictor)), calls)
    }

    fn image() -> Array3<u8> {
        Array3::zeros((3, 100, 100))
    }

    fn two_faces() -> Vec<Rectangle> {
        vec![Rectangle::new(0, 0, 10, 10), Rectangle::new(20, 30, 70, 90)]
    }

    #[test]
    fn test_supplied_box_skips_detection() {
        let predictor = FakePredictor::new();
        let seen = predictor.rects.clone();
        let (mut ex, calls) = extractor(two_faces(), predictor);
        let bb = BoundingBox::new((10, 20), (30, 40));

        let out = ex
            .extract(image().view(), Some(bb.into()), ExtractOptions::default())
            .unwrap();

        assert!(out.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(seen.lock().unwrap()[0], Rectangle::new(20, 10, 60, 40));
    }

    #[test]
    fn test_supplied_rectangle_is_used_as_is() {
        let predictor = FakePredictor::new();
        let seen = predictor.rects.clone();
        let (mut ex, calls) = extractor(vec![], predictor);
        let rect = Rectangle::new(1, 2, 3, 4);

        ex.extract(image().view(), Some(rect.into()), ExtractOptions::default())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(seen.lock().unwrap()[0], rect);
    }

    #[test]
    fn test_auto_detect_uses_largest_face() {
        let predictor = FakePredictor::new();
        let seen = predictor.rects.clone();
        let (mut ex, calls) = extractor(two_faces(), predictor);

        ex.extract(image().view(), None, ExtractOptions::default())
            .unwrap()
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().unwrap()[0], Rectangle::new(20, 30, 70, 90));
    }

    #[test]
    fn test_no_face_returns_none_without_predicting() {
        let predictor = FakePredictor::new();
        let seen = predictor.rects.clone();
        let (mut ex, _) = extractor(vec![], predictor);

        let out = ex
            .extract(image().view(), None, ExtractOptions::default())
            .unwrap();

        assert!(out.is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_detected_face_follows_selection_policy() {
        let one = vec![Rectangle::new(0, 0, 50, 50)];

        let (mut legacy, _) = extractor(one.clone(), FakePredictor::new());
        assert!(legacy
            .extract(image().view(), None, ExtractOptions::default())
            .unwrap()
            .is_none());

        let (mut any, _) = extractor(one, FakePredictor::new());
        any.detector_mut().set_policy(SelectionPolicy::AnyFace);
        assert!(any
            .extract(image().view(), None, ExtractOptions::default())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_default_output_is_row_col() {
        let (mut ex, _) = extractor(vec![], FakePredictor::new());
        let rect = Rectangle::new(5, 7, 50, 60);

        let out = ex
            .extract(image().view(), Some(rect.into()), ExtractOptions::default())
            .unwrap()
            .unwrap();

        let LandmarkOutput::Points(points) = out else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 68);
        assert_eq!(points[1], (7 + 2, 5 + 1));
    }

    #[test]
    fn test_xy_output_swaps_pairs() {
        let (mut ex, _) = extractor(vec![], FakePredictor::new());
        let rect = Rectangle::new(5, 7, 50, 60);
        let options = ExtractOptions {
            xy_output: true,
            named_format: false,
        };

        let out = ex
            .extract(image().view(), Some(rect.into()), options)
            .unwrap()
            .unwrap();

        assert_eq!(out, LandmarkOutput::Points((0..68).map(|i| (5 + i, 7 + 2 * i)).collect()));
    }

    #[test]
    fn test_named_format_ignores_xy_output() {
        let rect = Rectangle::new(0, 0, 10, 10);
        let named = ExtractOptions {
            xy_output: false,
            named_format: true,
        };
        let named_xy = ExtractOptions {
            xy_output: true,
            named_format: true,
        };

        let (mut ex, _) = extractor(vec![], FakePredictor::new());
        let a = ex.extract(image().view(), Some(rect.into()), named).unwrap();
        let b = ex.extract(image().view(), Some(rect.into()), named_xy).unwrap();

        assert_eq!(a, b);
        let Some(LandmarkOutput::Named(n)) = a else {
            panic!("expected named landmarks");
        };
        assert_eq!(n.nose, (66, 33));
        assert_eq!(n.leye, ((74 + 80) / 2, (37 + 40) / 2));
        assert_eq!(n.to_map().len(), NAMED_KEYS.len());
    }

    #[test]
    fn test_extract_default_uses_constructor_options() {
        let (ex, _) = extractor(vec![], FakePredictor::new());
        let mut ex = ex.with_options(ExtractOptions {
            xy_output: false,
            named_format: true,
        });

        let out = ex
            .extract_default(image().view(), Some(Rectangle::new(0, 0, 1, 1).into()))
            .unwrap();

        assert!(matches!(out, Some(LandmarkOutput::Named(_))));
    }

    #[test]
    fn test_invalid_box_is_an_error() {
        let (mut ex, _) = extractor(vec![], FakePredictor::new());
        let bb = BoundingBox::new((0, 0), (-5, 10));

        let err = ex
            .extract(image().view(), Some(bb.into()), ExtractOptions::default())
            .unwrap_err();

        assert!(matches!(err, LandmarkError::InvalidInput(_)));
    }

    #[test]
    fn test_bad_image_shape_is_an_error_when_box_supplied() {
        let (mut ex, _) = extractor(vec![], FakePredictor::new());
        let bad = Array3::<u8>::zeros((2, 10, 10));

        let err = ex
            .extract(bad.view(), Some(Rectangle::new(0, 0, 1, 1).into()), ExtractOptions::default())
            .unwrap_err();

        assert!(matches!(err, LandmarkError::ShapeMismatch(_)));
    }

    #[test]
    fn test_predictor_error_is_surfaced() {
        let mut predictor = FakePredictor::new();
        predictor.fail = true;
        let (mut ex, _) = extractor(vec![], predictor);

        let err = ex
            .extract(image().view(), Some(Rectangle::new(0, 0, 1, 1).into()), ExtractOptions::default())
            .unwrap_err();

        assert!(matches!(err, LandmarkError::Prediction(_)));
    }

    #[test]
    fn test_wrong_point_count_is_an_error() {
        let mut predictor = FakePredictor::new();
        predictor.count = 5;
        let (mut ex, _) = extractor(vec![], predictor);

        let err = ex
            .extract(image().view(), Some(Rectangle::new(0, 0, 1, 1).into()), ExtractOptions::default())
            .unwrap_err();

        assert!(matches!(err, LandmarkError::PointCount(5)));
    }

    #[test]
    fn test_from_model_missing_explicit_path_fails() {
        let tmp = TempDir::new().unwrap();
        let provisioner = ModelProvisioner::new(tmp.path());
        let adapter = FaceDetectorAdapter::new(Box::new(CountingDetector {
            rects: vec![],
            calls: Arc::new(AtomicUsize::new(0)),
        }));

        let result = LandmarkExtractor::from_model(
            Some(tmp.path().join("missing.dat").as_path()),
            &provisioner,
            adapter,
            |_| Ok(Box::new(FakePredictor::new()) as Box<dyn LandmarkPredictor>),
        );

        assert!(matches!(
            result,
            Err(LandmarkError::Model(ModelError::ModelNotFound(_)))
        ));
    }

    #[test]
    fn test_from_model_loads_predictor_from_resolved_path() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("custom.dat");
        fs::write(&model, b"model").unwrap();
        let provisioner = ModelProvisioner::new(tmp.path());
        let adapter = FaceDetectorAdapter::new(Box::new(CountingDetector {
            rects: vec![],
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let loaded_from = Arc::new(Mutex::new(None));
        let record = loaded_from.clone();

        let result = LandmarkExtractor::from_model(Some(model.as_path()), &provisioner, adapter, move |p| {
            *record.lock().unwrap() = Some(p.to_path_buf());
            Ok(Box::new(FakePredictor::new()) as Box<dyn LandmarkPredictor>)
        });

        assert!(result.is_ok());
        assert_eq!(loaded_from.lock().unwrap().as_deref(), Some(model.as_path()));
    }

    #[test]
    fn test_from_model_load_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("custom.dat");
        fs::write(&model, b"not a model").unwrap();
        let provisioner = ModelProvisioner::new(tmp.path());
        let adapter = FaceDetectorAdapter::new(Box::new(CountingDetector {
            rects: vec![],
            calls: Arc::new(AtomicUsize::new(0)),
        }));

        let result =
            LandmarkExtractor::from_model(Some(model.as_path()), &provisioner, adapter, |_| Err("corrupt".into()));

        assert!(matches!(result, Err(LandmarkError::PredictorLoad { .. })));
    }
}
