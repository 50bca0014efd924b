//! Stream dimensions and converted frame buffers

use crate::error::{Error, Result};

/// Bytes per pixel of packed RGB24
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// Stream size, queried once after open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDimensions {
    /// Frame width
    pub width: u32,

    /// Frame height
    pub height: u32,
}

impl StreamDimensions {
    /// Validate the raw values reported by a decoder
    pub fn from_native(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let dims = Self {
            width: width as u32,
            height: height as u32,
        };
        // Reject sizes whose RGB buffer would not fit in memory
        dims.checked_rgb_len()
            .ok_or(Error::InvalidDimensions { width, height })?;
        Ok(dims)
    }

    /// Bytes of one packed RGB24 frame
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB_BYTES_PER_PIXEL
    }

    fn checked_rgb_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(RGB_BYTES_PER_PIXEL)
    }
}

/// One converted frame, owned by the caller for a single tick
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    dimensions: StreamDimensions,
}

impl PixelBuffer {
    /// Zeroed buffer sized for `dimensions`
    pub fn zeroed(dimensions: StreamDimensions) -> Self {
        Self {
            data: vec![0u8; dimensions.rgb_len()],
            dimensions,
        }
    }

    /// Frame size
    pub fn dimensions(&self) -> StreamDimensions {
        self.dimensions
    }

    /// Get data size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Packed RGB bytes, row-major, no padding
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.dimensions.width)
            .field("height", &self.dimensions.height)
            .field("data_size", &self.data.len())
            .finish()
    }
}
