use crate::detection::domain::face_detector::BackendError;
use crate::landmarks::domain::landmarks::Point;
use crate::shared::bounding_box::Rectangle;
use crate::shared::frame::Frame;

/// External shape predictor capability.
///
/// Given an interleaved BGR frame and a face rectangle, returns the
/// predicted landmark points in model order.
pub trait LandmarkPredictor: Send {
    fn predict(&mut self, frame: &Frame, rect: &Rectangle) -> Result<Vec<Point>, BackendError>;
}
