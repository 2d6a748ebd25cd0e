use ndarray::{ArrayView, Dimension};

use crate::detection::domain::detections::{Detections, SelectionPolicy};
use crate::detection::domain::face_detector::{BackendError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{DETECTION_UPSCALE, PLACEHOLDER_SCORE};
use crate::shared::image_layout::to_interleaved;

/// Runs an external [`FaceDetector`] on planar RGB images.
///
/// Converts the image to interleaved BGR, maps rectangles back to
/// [`BoundingBox`]es and attaches [`PLACEHOLDER_SCORE`] to each one.
/// Detector failures are logged and reported as [`Detections::Failed`].
pub struct FaceDetectorAdapter {
    inner: Box<dyn FaceDetector>,
    policy: SelectionPolicy,
}

impl FaceDetectorAdapter {
    pub fn new(inner: Box<dyn FaceDetector>) -> Self {
        Self {
            inner,
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Finds every face in a `(3, H, W)` RGB image.
    pub fn detect_all<D: Dimension>(&mut self, image: ArrayView<'_, u8, D>) -> Detections {
        match self.try_detect_all(image) {
            Ok(boxes) => {
                log::debug!("Detected {} face(s)", boxes.len());
                let scores = vec![PLACEHOLDER_SCORE; boxes.len()];
                Detections::found(boxes, scores)
            }
            Err(e) => {
                log::warn!("Face detection failed: {e}");
                Detections::Failed
            }
        }
    }

    /// The largest face and its score, subject to the selection policy.
    pub fn detect_largest<D: Dimension>(
        &mut self,
        image: ArrayView<'_, u8, D>,
    ) -> Option<(BoundingBox, f64)> {
        self.detect_all(image).largest(self.policy)
    }

    fn try_detect_all<D: Dimension>(
        &mut self,
        image: ArrayView<'_, u8, D>,
    ) -> Result<Vec<BoundingBox>, BackendError> {
        let frame = to_interleaved(image, true)?;
        let rectangles = self.inner.detect(&frame, DETECTION_UPSCALE)?;
        let boxes = rectangles
            .iter()
            .map(|r| r.to_bounding_box())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(boxes)
    }
}
