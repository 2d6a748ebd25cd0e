use crate::shared::bounding_box::Rectangle;
use crate::shared::frame::Frame;

/// Error type produced by external capabilities.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// External face detection capability.
///
/// Receives an interleaved BGR frame and a pyramid upsampling factor and
/// returns one rectangle per face. The underlying objects are not assumed to
/// be thread-safe, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame, upscale: u32) -> Result<Vec<Rectangle>, BackendError>;
}
