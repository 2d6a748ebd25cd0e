/// dlib ensemble-of-regression-trees shape predictor via `dlib-face-recognition`.
use std::path::Path;

use dlib_face_recognition::LandmarkPredictorTrait;

use crate::detection::domain::face_detector::BackendError;
use crate::detection::infrastructure::dlib_face_detector::image_matrix;
use crate::landmarks::domain::landmark_predictor::LandmarkPredictor;
use crate::landmarks::domain::landmarks::Point;
use crate::shared::bounding_box::Rectangle;
use crate::shared::frame::Frame;

pub struct DlibLandmarkPredictor {
    inner: dlib_face_recognition::LandmarkPredictor,
}

impl DlibLandmarkPredictor {
    /// Load a `shape_predictor_68_face_landmarks.dat` style model.
    pub fn open(model: &Path) -> Result<Self, BackendError> {
        let inner = dlib_face_recognition::LandmarkPredictor::open(model)?;
        Ok(Self { inner })
    }
}

impl LandmarkPredictor for DlibLandmarkPredictor {
    fn predict(&mut self, frame: &Frame, rect: &Rectangle) -> Result<Vec<Point>, BackendError> {
        let matrix = image_matrix(frame)?;
        let dlib_rect = dlib_face_recognition::Rectangle {
            left: c_long(rect.left)?,
            top: c_long(rect.top)?,
            right: c_long(rect.right)?,
            bottom: c_long(rect.bottom)?,
        };
        let landmarks = self.inner.face_landmarks(&matrix, &dlib_rect);
        Ok(landmarks
            .iter()
            .map(|p| Point::new(i64::from(p.x()), i64::from(p.y())))
            .collect())
    }
}

fn c_long(v: i64) -> Result<std::os::raw::c_long, BackendError> {
    v.try_into()
        .map_err(|_| format!("rectangle coordinate {v} out of range for dlib").into())
}
