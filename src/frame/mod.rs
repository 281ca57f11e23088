//! Frame buffers handed over by the host
//!
//! Pixel data is BGRA, 4 bytes per pixel, row-major with an explicit
//! row stride. The pipeline borrows frames for one call and converts them
//! into `image` buffers; a frame that cannot be converted is reported as
//! a [`FrameError`] and the caller leaves its output untouched.

use image::{GrayImage, RgbaImage};
use thiserror::Error;

/// Bytes per pixel in every frame
pub const BYTES_PER_PIXEL: usize = 4;

/// Failure to access a frame's pixel buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame has zero extent ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("row stride {stride} is smaller than {required} bytes")]
    StrideTooSmall { stride: usize, required: usize },
    #[error("pixel buffer holds {len} bytes, {required} required")]
    BufferTooSmall { len: usize, required: usize },
    #[error("frame size {actual:?} does not match {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// A host-owned BGRA frame
#[derive(Debug, Clone)]
pub struct PixelFrame {
    /// Raw BGRA pixel data
    data: Vec<u8>,
    /// Frame width in pixels
    width: u32,
    /// Frame height in pixels
    height: u32,
    /// Bytes between the starts of consecutive rows
    stride: usize,
}

impl PixelFrame {
    /// Create a zeroed, tightly packed frame
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self {
            data: vec![0; stride * height as usize],
            width,
            height,
            stride,
        }
    }

    /// Wrap a host buffer as-is. Layout problems surface on conversion.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, stride: usize) -> Self {
        Self {
            data,
            width,
            height,
            stride,
        }
    }

    /// Build a tightly packed BGRA frame from an RGBA image
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = image.as_raw().clone();
        for chunk in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.swap(0, 2);
        }
        Self::from_raw(data, width, height, width as usize * BYTES_PER_PIXEL)
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw buffer, including any row padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Check that the buffer can hold `height` rows of `width` pixels
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::Empty {
                width: self.width,
                height: self.height,
            });
        }

        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if self.stride < row_bytes {
            return Err(FrameError::StrideTooSmall {
                stride: self.stride,
                required: row_bytes,
            });
        }

        // Last row does not need trailing padding
        let required = self.stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < required {
            return Err(FrameError::BufferTooSmall {
                len: self.data.len(),
                required,
            });
        }

        Ok(())
    }

    /// Copy the frame into an RGBA image
    pub fn to_rgba(&self) -> Result<RgbaImage, FrameError> {
        self.validate()?;

        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in self.data.chunks(self.stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        for chunk in packed.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.swap(0, 2);
        }

        RgbaImage::from_raw(self.width, self.height, packed).ok_or(FrameError::BufferTooSmall {
            len: self.data.len(),
            required: row_bytes * self.height as usize,
        })
    }

    /// Overwrite the frame with an RGBA image of identical size
    pub fn write_rgba(&mut self, image: &RgbaImage) -> Result<(), FrameError> {
        self.validate()?;
        if image.dimensions() != self.dimensions() {
            return Err(FrameError::DimensionMismatch {
                expected: self.dimensions(),
                actual: image.dimensions(),
            });
        }

        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let stride = self.stride;
        for (dst, src) in self
            .data
            .chunks_mut(stride)
            .zip(image.as_raw().chunks_exact(row_bytes))
        {
            for (d, s) in dst[..row_bytes]
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(src.chunks_exact(BYTES_PER_PIXEL))
            {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
                d[3] = s[3];
            }
        }

        Ok(())
    }

    /// Overwrite the frame with a grayscale image rendered opaque
    pub fn write_gray(&mut self, image: &GrayImage) -> Result<(), FrameError> {
        let rgba = image::DynamicImage::ImageLuma8(image.clone()).to_rgba8();
        self.write_rgba(&rgba)
    }
}

/// Convert an input/output pair, or report why the pair is unusable
pub fn convert_pair(
    input: &PixelFrame,
    output: &PixelFrame,
) -> Result<(RgbaImage, RgbaImage), FrameError> {
    let input_image = input.to_rgba()?;
    let output_image = output.to_rgba()?;
    if input_image.dimensions() != output_image.dimensions() {
        return Err(FrameError::DimensionMismatch {
            expected: input_image.dimensions(),
            actual: output_image.dimensions(),
        });
    }
    Ok((input_image, output_image))
}
