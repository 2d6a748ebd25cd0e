use crate::shared::bounding_box::BoundingBox;

/// Outcome of running the face detector over one image.
///
/// `Found` holds order-correlated boxes and scores of equal length; it may be
/// empty when the frame simply contains no face. `Failed` means the detector
/// itself errored and was absorbed.
#[derive(Clone, Debug, PartialEq)]
pub enum Detections {
    Found {
        boxes: Vec<BoundingBox>,
        scores: Vec<f64>,
    },
    Failed,
}

/// How [`Detections::largest`] decides whether there is anything to select.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Only select when more than one face was found; a single detection
    /// yields `None`. Matches long-standing behaviour that downstream callers
    /// depend on, although it is likely unintended.
    #[default]
    RequireMultiple,
    /// Select the largest face whenever at least one was found.
    AnyFace,
}

impl Detections {
    pub fn found(boxes: Vec<BoundingBox>, scores: Vec<f64>) -> Self {
        debug_assert_eq!(boxes.len(), scores.len(), "boxes and scores must align");
        Detections::Found { boxes, scores }
    }

    pub fn len(&self) -> usize {
        match self {
            Detections::Found { boxes, .. } => boxes.len(),
            Detections::Failed => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Detections::Failed)
    }

    /// Picks the box with the largest area along with its score.
    ///
    /// The index of the first maximum area is used to pick from both the
    /// boxes and the scores.
    pub fn largest(&self, policy: SelectionPolicy) -> Option<(BoundingBox, f64)> {
        let Detections::Found { boxes, scores } = self else {
            return None;
        };
        let min_faces = match policy {
            SelectionPolicy::RequireMultiple => 2,
            SelectionPolicy::AnyFace => 1,
        };
        if boxes.len() < min_faces {
            return None;
        }

        let mut index = 0;
        for (i, bb) in boxes.iter().enumerate().skip(1) {
            if bb.area() > boxes[index].area() {
                index = i;
            }
        }
        Some((boxes[index], *scores.get(index)?))
    }
}
