use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("bounding box has negative size {height}x{width}")]
    NegativeSize { height: i64, width: i64 },
    #[error("bounding box corner overflows the coordinate range")]
    Overflow,
    #[error("rectangle is inverted: left={left} top={top} right={right} bottom={bottom}")]
    InvertedRectangle {
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
    },
}

/// Axis-aligned face region as a top-left corner plus size.
///
/// Coordinates are `(row, col)`; size is `(height, width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub top: i64,
    pub left: i64,
    pub height: i64,
    pub width: i64,
}

impl BoundingBox {
    pub fn new(top_left: (i64, i64), size: (i64, i64)) -> Self {
        Self {
            top: top_left.0,
            left: top_left.1,
            height: size.0,
            width: size.1,
        }
    }

    pub fn top_left(&self) -> (i64, i64) {
        (self.top, self.left)
    }

    pub fn size(&self) -> (i64, i64) {
        (self.height, self.width)
    }

    /// `top_left + size`, or `None` on overflow.
    pub fn bottom_right(&self) -> Option<(i64, i64)> {
        Some((
            self.top.checked_add(self.height)?,
            self.left.checked_add(self.width)?,
        ))
    }

    /// Area in pixels.
    pub fn area(&self) -> i128 {
        self.height as i128 * self.width as i128
    }

    pub fn to_rectangle(&self) -> Result<Rectangle, InvalidInput> {
        if self.height < 0 || self.width < 0 {
            return Err(InvalidInput::NegativeSize {
                height: self.height,
                width: self.width,
            });
        }
        let (bottom, right) = self.bottom_right().ok_or(InvalidInput::Overflow)?;
        Ok(Rectangle {
            left: self.left,
            top: self.top,
            right,
            bottom,
        })
    }
}

/// Axis-aligned region in the external library's edge representation.
///
/// `left`/`right` are columns, `top`/`bottom` are rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rectangle {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn to_bounding_box(&self) -> Result<BoundingBox, InvalidInput> {
        if self.right < self.left || self.bottom < self.top {
            return Err(InvalidInput::InvertedRectangle {
                left: self.left,
                top: self.top,
                right: self.right,
                bottom: self.bottom,
            });
        }
        let height = self.bottom.checked_sub(self.top).ok_or(InvalidInput::Overflow)?;
        let width = self.right.checked_sub(self.left).ok_or(InvalidInput::Overflow)?;
        Ok(BoundingBox::new((self.top, self.left), (height, width)))
    }

    /// Map a rectangle found on an image enlarged by `factor` back onto the
    /// original image. Coordinates round toward negative infinity.
    pub fn scaled_down(&self, factor: i64) -> Rectangle {
        let factor = factor.max(1);
        Rectangle::new(
            self.left.div_euclid(factor),
            self.top.div_euclid(factor),
            self.right.div_euclid(factor),
            self.bottom.div_euclid(factor),
        )
    }
}

impl TryFrom<BoundingBox> for Rectangle {
    type Error = InvalidInput;

    fn try_from(bb: BoundingBox) -> Result<Self, Self::Error> {
        bb.to_rectangle()
    }
}

impl TryFrom<Rectangle> for BoundingBox {
    type Error = InvalidInput;

    fn try_from(rect: Rectangle) -> Result<Self, Self::Error> {
        rect.to_bounding_box()
    }
}

/// A caller-supplied face region, either native or already converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceRegion {
    Box(BoundingBox),
    Rect(Rectangle),
}

impl FaceRegion {
    pub fn to_rectangle(&self) -> Result<Rectangle, InvalidInput> {
        match self {
            FaceRegion::Box(bb) => bb.to_rectangle(),
            FaceRegion::Rect(rect) => {
                // Validates edge ordering without changing the rectangle.
                rect.to_bounding_box()?;
                Ok(*rect)
            }
        }
    }
}

impl From<BoundingBox> for FaceRegion {
    fn from(bb: BoundingBox) -> Self {
        FaceRegion::Box(bb)
    }
}

impl From<Rectangle> for FaceRegion {
    fn from(rect: Rectangle) -> Self {
        FaceRegion::Rect(rect)
    }
}
