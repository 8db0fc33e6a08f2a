//! Decoded pixel buffers
//!
//! The pipeline does not decode images itself; callers hand it RGBA8 buffers
//! produced by whatever decoder they use. `Bytes` keeps clones cheap so the
//! same decoded LUT can back several sessions.

use bytes::Bytes;

use crate::error::PipelineError;

/// An owned, decoded RGBA8 image buffer (tightly packed, row-major, top-down).
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Bytes,
}

impl PixelBuffer {
    /// Wraps a decoded RGBA8 buffer, validating its size against the
    /// dimensions.
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Result<Self, PipelineError> {
        let data = data.into();
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(PipelineError::AssetLoad {
                reason: format!(
                    "pixel buffer size mismatch: {}x{} RGBA8 needs {expected} bytes, got {}",
                    width,
                    height,
                    data.len()
                ),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Buffer width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, tightly packed
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_buffer() {
        let buffer = PixelBuffer::new(2, 3, vec![0u8; 24]).unwrap();
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.data().len(), 24);
    }

    #[test]
    fn test_rejects_size_mismatch() {
        assert!(matches!(
            PixelBuffer::new(2, 2, vec![0u8; 15]),
            Err(PipelineError::AssetLoad { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_dimension() {
        assert!(PixelBuffer::new(0, 4, Vec::new()).is_err());
    }
}
