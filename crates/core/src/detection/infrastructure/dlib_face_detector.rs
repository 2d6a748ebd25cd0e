/// dlib HOG frontal face detector via `dlib-face-recognition`.
use dlib_face_recognition::{FaceDetectorTrait, ImageMatrix};

use crate::detection::domain::face_detector::{BackendError, FaceDetector};
use crate::shared::bounding_box::Rectangle;
use crate::shared::frame::Frame;

pub struct DlibFaceDetector {
    inner: dlib_face_recognition::FaceDetector,
}

impl DlibFaceDetector {
    pub fn new() -> Self {
        Self {
            inner: dlib_face_recognition::FaceDetector::new(),
        }
    }
}

impl Default for DlibFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for DlibFaceDetector {
    fn detect(&mut self, frame: &Frame, upscale: u32) -> Result<Vec<Rectangle>, BackendError> {
        // `face_locations` never upsamples, so the pyramid levels are applied here.
        let upscaled = frame.upscaled(upscale).ok_or_else(|| {
            format!(
                "cannot upscale {}x{} frame by {upscale} levels",
                frame.width(),
                frame.height()
            )
        })?;
        let factor = 1i64 << upscale;
        log::trace!(
            "dlib detection on {}x{} (upscale {upscale})",
            upscaled.width(),
            upscaled.height()
        );

        let matrix = image_matrix(&upscaled)?;
        let locations = self.inner.face_locations(&matrix);
        Ok(locations
            .iter()
            .map(|r| {
                Rectangle::new(
                    i64::from(r.left),
                    i64::from(r.top),
                    i64::from(r.right),
                    i64::from(r.bottom),
                )
                .scaled_down(factor)
            })
            .collect())
    }
}

/// Wraps an interleaved 3-channel frame for dlib. dlib copies the pixels.
pub(crate) fn image_matrix(frame: &Frame) -> Result<ImageMatrix, BackendError> {
    if frame.channels() != 3 {
        return Err(format!("dlib expects 3 channels, got {}", frame.channels()).into());
    }
    // Safety: `Frame` guarantees `width * height * 3` bytes and dlib only
    // reads them during construction.
    Ok(unsafe {
        ImageMatrix::new(
            frame.width() as usize,
            frame.height() as usize,
            frame.data().as_ptr(),
        )
    })
}
