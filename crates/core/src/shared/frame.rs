use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use ndarray::ArrayView3;

/// An interleaved (channel-last) 8-bit image as handed to the external
/// detector and shape predictor.
///
/// Pixel data is row-major `(height, width, channels)`. After
/// [`to_interleaved`](crate::shared::image_layout::to_interleaved) with
/// colour swap enabled the channel order is B, G, R.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Enlarge the frame by `2^levels` in both directions with bilinear
    /// filtering, the way dlib's `pyramid_up` prepares images for small
    /// faces. `None` for non 3-channel frames or when the result would not
    /// fit in `u32` dimensions.
    pub fn upscaled(&self, levels: u32) -> Option<Frame> {
        if self.channels != 3 {
            return None;
        }
        if levels == 0 {
            return Some(self.clone());
        }
        let factor = 1u32.checked_shl(levels)?;
        let width = self.width.checked_mul(factor)?;
        let height = self.height.checked_mul(factor)?;

        let source: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())?;
        let resized = imageops::resize(&source, width, height, FilterType::Triangle);
        Some(Frame::new(resized.into_raw(), width, height, 3))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
