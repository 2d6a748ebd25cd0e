//! Planar RGB `(3, H, W)` to interleaved BGR `(H, W, 3)` conversion.
//!
//! The external detector and shape predictor read interleaved 8-bit pixels
//! with blue first, while callers hold channel-first RGB arrays. Conversion
//! is a pure reindexing: every output byte is a copy of some input byte.

use ndarray::{Array3, ArrayView, Dimension, Ix3};
use thiserror::Error;

use crate::shared::frame::Frame;

const CHANNELS: usize = 3;

/// Source channel for each destination channel when swapping RGB to BGR.
const SWAP_ORDER: [usize; CHANNELS] = [2, 1, 0];

/// Source channel for each destination channel without swapping.
///
/// Destination channel 2 is filled from source channel 1, so this path never
/// carries a red channel. Kept for compatibility with existing callers.
const KEEP_ORDER: [usize; CHANNELS] = [0, 1, 1];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("expected an image of shape (3, height, width), got {shape:?}")]
    ShapeMismatch { shape: Vec<usize> },
}

/// Reorders a planar `(3, H, W)` image into an interleaved [`Frame`].
///
/// With `swap_colors` the channel order becomes B, G, R. Any other rank or
/// channel count fails with [`LayoutError::ShapeMismatch`].
pub fn to_interleaved<D: Dimension>(
    image: ArrayView<'_, u8, D>,
    swap_colors: bool,
) -> Result<Frame, LayoutError> {
    let shape = image.shape().to_vec();
    let mismatch = || LayoutError::ShapeMismatch {
        shape: shape.clone(),
    };

    let planar = image.into_dimensionality::<Ix3>().map_err(|_| mismatch())?;
    let (channels, height, width) = planar.dim();
    if channels != CHANNELS {
        return Err(mismatch());
    }
    let frame_width = u32::try_from(width).map_err(|_| mismatch())?;
    let frame_height = u32::try_from(height).map_err(|_| mismatch())?;

    let order = if swap_colors { SWAP_ORDER } else { KEEP_ORDER };
    let mut data = Vec::with_capacity(height * width * CHANNELS);
    for row in 0..height {
        for col in 0..width {
            for &src in &order {
                data.push(planar[[src, row, col]]);
            }
        }
    }

    Ok(Frame::new(data, frame_width, frame_height, CHANNELS as u8))
}

/// Inverse of [`to_interleaved`] with colour swap: interleaved BGR back to
/// planar RGB.
pub fn to_planar(frame: &Frame) -> Result<Array3<u8>, LayoutError> {
    let view = frame.as_ndarray();
    let (height, width, channels) = view.dim();
    if channels != CHANNELS {
        return Err(LayoutError::ShapeMismatch {
            shape: view.shape().to_vec(),
        });
    }

    Ok(Array3::from_shape_fn((CHANNELS, height, width), |(c, row, col)| {
        view[[row, col, SWAP_ORDER[c]]]
    }))
}
